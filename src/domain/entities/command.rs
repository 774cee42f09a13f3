use std::collections::HashMap;

use crate::application::errors::CommandError;

/// Closed set of behaviours a command can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandHandler {
    /// Send the instructions and register the sender
    Start,
}

/// Represents a bot command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub description: Option<String>,
    pub handler: Option<CommandHandler>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            handler: None,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_handler(mut self, handler: CommandHandler) -> Self {
        self.handler = Some(handler);
        self
    }
}

/// Command registry keyed by the full command token, e.g. `/start`.
///
/// A command registered without a handler is recognized but does nothing,
/// which is different from a command that was never registered.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Command>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a command, replacing any earlier registration with the same name
    pub fn register(&mut self, command: Command) {
        self.commands.insert(command.name.clone(), command);
    }

    pub fn resolve(&self, name: &str) -> Result<Option<CommandHandler>, CommandError> {
        self.commands
            .get(name)
            .map(|cmd| cmd.handler)
            .ok_or_else(|| CommandError::NotFound(name.to_string()))
    }

    /// Commands sorted by name
    pub fn all(&self) -> Vec<&Command> {
        let mut commands: Vec<&Command> = self.commands.values().collect();
        commands.sort_by(|a, b| a.name.cmp(&b.name));
        commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_unregistered_is_not_found() {
        let registry = CommandRegistry::new();
        assert!(matches!(
            registry.resolve("/unknown"),
            Err(CommandError::NotFound(name)) if name == "/unknown"
        ));
    }

    #[test]
    fn resolve_registered_without_handler_is_noop() {
        let mut registry = CommandRegistry::new();
        registry.register(Command::new("/help"));
        assert_eq!(registry.resolve("/help").unwrap(), None);
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = CommandRegistry::new();
        registry.register(Command::new("/start"));
        registry.register(Command::new("/start").with_handler(CommandHandler::Start));
        assert_eq!(registry.resolve("/start").unwrap(), Some(CommandHandler::Start));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registering_twice_is_idempotent() {
        let mut once = CommandRegistry::new();
        once.register(Command::new("/start").with_handler(CommandHandler::Start));

        let mut twice = CommandRegistry::new();
        twice.register(Command::new("/start").with_handler(CommandHandler::Start));
        twice.register(Command::new("/start").with_handler(CommandHandler::Start));

        assert_eq!(once.resolve("/start").unwrap(), twice.resolve("/start").unwrap());
        assert_eq!(once.len(), twice.len());
    }

    #[test]
    fn keys_are_case_sensitive() {
        let mut registry = CommandRegistry::new();
        registry.register(Command::new("/start"));
        assert!(registry.resolve("/START").is_err());
    }
}
