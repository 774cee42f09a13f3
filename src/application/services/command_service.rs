use crate::application::errors::CommandError;
use crate::domain::entities::{Command, CommandHandler, CommandRegistry};

pub const COMMAND_START: &str = "/start";
pub const COMMAND_HELP: &str = "/help";

/// Service for registering and resolving commands
#[derive(Debug, Default)]
pub struct CommandService {
    registry: CommandRegistry,
}

impl CommandService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Service with `/start` and `/help` registered
    pub fn with_defaults() -> Self {
        let mut service = Self::new();
        service.register_defaults();
        service
    }

    pub fn register(&mut self, command: Command) {
        self.registry.register(command);
    }

    pub fn register_defaults(&mut self) {
        self.register(Command::new(COMMAND_START)
            .with_description("Start bot")
            .with_handler(CommandHandler::Start));

        // Recognized, no behaviour attached yet
        self.register(Command::new(COMMAND_HELP)
            .with_description("Available commands"));
    }

    /// Resolve raw command text such as `/start@my_bot now`
    pub fn resolve(&self, input: &str) -> Result<Option<CommandHandler>, CommandError> {
        self.registry.resolve(command_key(input))
    }

    /// `(command, description)` pairs for platform command menus
    pub fn descriptions(&self) -> Vec<(String, String)> {
        self.registry
            .all()
            .into_iter()
            .map(|cmd| {
                (
                    cmd.name.trim_start_matches('/').to_string(),
                    cmd.description.clone().unwrap_or_default(),
                )
            })
            .collect()
    }
}

/// First token of a command with any `@botname` suffix removed
pub fn command_key(input: &str) -> &str {
    let token = input.split_whitespace().next().unwrap_or("");
    match token.split_once('@') {
        Some((name, _bot)) => name,
        None => token,
    }
}
