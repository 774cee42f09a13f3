//! Domain layer - Core business objects with no infrastructure dependencies
//! 
//! This layer contains:
//! - Entities: Core business objects (User, Measurement, Update, Command)
//! - Traits: Abstractions for infrastructure (Bot, Store)

pub mod entities;
pub mod traits;
