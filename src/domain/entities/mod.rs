//! Domain entities - Core business objects with no external dependencies

pub mod user;
pub mod measurement;
pub mod update;
pub mod command;

pub use user::User;
pub use measurement::Measurement;
pub use update::{Update, COMMAND_MARKER};
pub use command::{Command, CommandHandler, CommandRegistry};
