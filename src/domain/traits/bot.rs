use async_trait::async_trait;

use crate::application::errors::BotError;
use crate::domain::entities::Update;

/// Bot trait - abstraction for messaging platform adapters.
///
/// Adapters own their network retries: `next_update` only returns once an
/// update is available or the underlying stream has ended for good.
#[async_trait]
pub trait Bot: Send + Sync {
    /// Wait for the next inbound update; `None` when the stream is closed
    async fn next_update(&mut self) -> Option<Update>;

    /// Send a plain text message to a chat
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), BotError>;

    /// Get bot info
    fn bot_info(&self) -> BotInfo;
}

/// Bot information
#[derive(Debug, Clone)]
pub struct BotInfo {
    pub id: i64,
    pub name: String,
    pub username: String,
}
