//! Application layer errors

use std::time::Duration;

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Telegram API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Command resolution errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("Command not found: {0}")]
    NotFound(String),
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Nothing stored yet; an expected outcome for first-time users
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub fn timed_out(after: Duration) -> Self {
        StorageError::Unavailable(format!("timed out after {:?}", after))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Measurement text that could not be turned into a number
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("failed to convert \"{input}\" to a decimal value: {reason}")]
    InvalidFloatFormat { input: String, reason: String },

    #[error("failed to convert \"{input}\" to an integer value: {reason}")]
    InvalidIntFormat { input: String, reason: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Parse error: {0}")]
    Parse(String),
}
