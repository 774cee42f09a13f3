//! baby-bot - records numeric measurements sent to a chat bot and replies
//! with the change since the previous reading.

pub mod domain;
pub mod application;
pub mod infrastructure;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
