//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Configuration loading
//! - Storage / Database: Store implementations (memory, SQLite)
//! - Adapters: Platform integrations (Telegram, console)
//! - Keep-alive: Ping and HTTP responder for idling hosts

pub mod config;
pub mod storage;
pub mod database;
pub mod adapters;
pub mod keepalive;
