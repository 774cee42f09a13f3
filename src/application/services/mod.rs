//! Application services - Command registration and lookup

pub mod command_service;

pub use command_service::{command_key, CommandService};
