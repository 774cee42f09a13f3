//! Message handling - Update classification, value parsing and replies

pub mod dispatcher;
pub mod parser;
pub mod replies;

pub use dispatcher::{Dispatcher, Route};
pub use parser::ValueParser;
