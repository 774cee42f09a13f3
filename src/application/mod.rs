//! Application layer - Use cases and business logic
//! 
//! This layer contains:
//! - Services: Command registration defaults
//! - Errors: Domain-specific errors
//! - Messaging: Value parsing, reply texts, update dispatching

pub mod errors;
pub mod services;
pub mod messaging;
