use super::User;

/// Prefix that marks a message or callback payload as a command
pub const COMMAND_MARKER: char = '/';

/// A single inbound event delivered by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// A chat message; `is_command` is the platform's own command flag
    Message {
        chat_id: i64,
        from: Option<User>,
        text: String,
        is_command: bool,
    },
    /// An inline button press carrying its callback data
    Callback {
        chat_id: i64,
        from: Option<User>,
        data: String,
    },
}

impl Update {
    /// Build a message, flagging it as a command when it starts with the marker
    pub fn message(chat_id: i64, from: Option<User>, text: impl Into<String>) -> Self {
        let text = text.into();
        let is_command = text.starts_with(COMMAND_MARKER);
        Update::Message {
            chat_id,
            from,
            text,
            is_command,
        }
    }

    pub fn callback(chat_id: i64, from: Option<User>, data: impl Into<String>) -> Self {
        Update::Callback {
            chat_id,
            from,
            data: data.into(),
        }
    }

    pub fn chat_id(&self) -> i64 {
        match self {
            Update::Message { chat_id, .. } | Update::Callback { chat_id, .. } => *chat_id,
        }
    }

    pub fn sender(&self) -> Option<&User> {
        match self {
            Update::Message { from, .. } | Update::Callback { from, .. } => from.as_ref(),
        }
    }

    pub fn sender_id(&self) -> Option<i64> {
        self.sender().map(|u| u.id)
    }

    /// Message text or callback data
    pub fn payload(&self) -> &str {
        match self {
            Update::Message { text, .. } => text,
            Update::Callback { data, .. } => data,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Update::Message { .. } => "message",
            Update::Callback { .. } => "callback",
        }
    }
}
