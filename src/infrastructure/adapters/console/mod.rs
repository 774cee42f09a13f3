//! Console adapter for development/testing

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

use crate::application::errors::BotError;
use crate::domain::entities::{Update, User};
use crate::domain::traits::{Bot, BotInfo};

/// Chat and user id used for everything typed on the console
pub const CONSOLE_ID: i64 = 1;

/// Console bot adapter; each input line is one message
pub struct ConsoleAdapter<R = BufReader<Stdin>> {
    info: BotInfo,
    user: User,
    // Only touched through `&mut self`, the mutex just makes the adapter Sync
    lines: Mutex<Lines<R>>,
}

impl ConsoleAdapter {
    pub fn new() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> ConsoleAdapter<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn from_reader(reader: R) -> Self {
        Self {
            info: BotInfo {
                id: 0,
                name: "baby-bot".to_string(),
                username: "console".to_string(),
            },
            user: User::new(CONSOLE_ID, "console"),
            lines: Mutex::new(reader.lines()),
        }
    }
}

#[async_trait]
impl<R> Bot for ConsoleAdapter<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_update(&mut self) -> Option<Update> {
        match self.lines.get_mut().next_line().await {
            Ok(Some(line)) => Some(Update::message(CONSOLE_ID, Some(self.user.clone()), line.trim_end())),
            Ok(None) => None,
            Err(e) => {
                tracing::error!("Failed to read console input: {}", e);
                None
            }
        }
    }

    async fn send_message(&self, _chat_id: i64, text: &str) -> Result<(), BotError> {
        println!("[BOT] {}", text);
        Ok(())
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}
