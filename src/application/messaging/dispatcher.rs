//! Update dispatcher - Routes inbound updates to commands or measurements

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::parser::ValueParser;
use super::replies;
use crate::application::errors::{BotError, StorageError};
use crate::application::services::CommandService;
use crate::domain::entities::{CommandHandler, Measurement, Update, COMMAND_MARKER};
use crate::domain::traits::{Bot, Store};

/// Upper bound for a single store call
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Where an update goes after classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    /// Command text or callback data starting with the command marker
    Command(&'a str),
    /// Free text, treated as a measurement
    Text(&'a str),
    Ignore,
}

impl<'a> Route<'a> {
    pub fn classify(update: &'a Update) -> Self {
        match update {
            Update::Message { text, is_command, .. }
                if *is_command || text.starts_with(COMMAND_MARKER) =>
            {
                Route::Command(text)
            }
            Update::Callback { data, .. } if data.starts_with(COMMAND_MARKER) => Route::Command(data),
            Update::Message { text, .. } if !text.is_empty() => Route::Text(text),
            _ => Route::Ignore,
        }
    }
}

/// Drains a transport one update at a time.
///
/// Updates are never handled concurrently, so the read-last/write-new pair
/// for a user cannot interleave with another update from the same user.
pub struct Dispatcher<B: Bot> {
    commands: CommandService,
    parser: ValueParser,
    store: Arc<dyn Store>,
    bot: B,
    store_timeout: Duration,
}

impl<B: Bot> Dispatcher<B> {
    pub fn new(commands: CommandService, parser: ValueParser, store: Arc<dyn Store>, bot: B) -> Self {
        Self {
            commands,
            parser,
            store,
            bot,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Process updates until cancelled or the transport closes its stream
    pub async fn run(&mut self, cancel: CancellationToken) {
        tracing::info!("Starting update loop...");

        loop {
            let update = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Cancellation requested, stopping update loop");
                    break;
                }
                update = self.bot.next_update() => update,
            };

            match update {
                Some(update) => self.handle_update(update).await,
                None => {
                    tracing::info!("Update stream closed");
                    break;
                }
            }
        }

        tracing::info!("Update loop finished");
    }

    /// Handle a single update; errors never escape this call
    pub async fn handle_update(&self, update: Update) {
        match Route::classify(&update) {
            Route::Command(input) => self.handle_command(&update, input).await,
            Route::Text(text) => self.handle_text(&update, text).await,
            Route::Ignore => {
                tracing::debug!("Ignoring {} without usable text in chat {}", update.kind(), update.chat_id());
            }
        }
    }

    async fn handle_command(&self, update: &Update, input: &str) {
        let user_id = sender_id_or_default(update);
        tracing::debug!("User {} sent command {:?}", user_id, input);

        match self.commands.resolve(input) {
            Err(e) => tracing::warn!("Can't find handler: {}", e),
            Ok(None) => tracing::debug!("Command {:?} has no handler", input),
            Ok(Some(handler)) => {
                if let Err(e) = self.invoke(handler, update).await {
                    tracing::error!("Command {:?} failed: {}", input, e);
                }
            }
        }
    }

    async fn invoke(&self, handler: CommandHandler, update: &Update) -> Result<(), BotError> {
        match handler {
            CommandHandler::Start => self.handle_start(update).await,
        }
    }

    async fn handle_start(&self, update: &Update) -> Result<(), BotError> {
        self.reply(update.chat_id(), replies::START).await;

        match update.sender() {
            Some(user) => {
                self.timed(self.store.add_user(user)).await?;
                tracing::info!("Registered user {} ({})", user.id, user);
            }
            None => tracing::warn!("Can't determine sender of /start, skipping registration"),
        }

        Ok(())
    }

    async fn handle_text(&self, update: &Update, text: &str) {
        let received_at = Utc::now();
        let chat_id = update.chat_id();
        let user_id = sender_id_or_default(update);
        tracing::debug!("Received text from user {}: {:?}", user_id, text);

        let value = match self.parser.parse(text) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Rejected input from user {}: {}", user_id, e);
                self.reply(chat_id, replies::INVALID_VALUE).await;
                return;
            }
        };
        let measurement = Measurement::at(received_at, user_id, value);

        let previous = match self.timed(self.store.get_last(user_id)).await {
            Ok(previous) => previous,
            Err(e) if e.is_not_found() => {
                tracing::debug!("No previous measurement for user {}", user_id);
                0
            }
            Err(e) => {
                tracing::error!("Failed to get last value for user {}: {}", user_id, e);
                0
            }
        };

        // The delta is already known, so the reply goes out even if this fails
        if let Err(e) = self.timed(self.store.put(&measurement)).await {
            tracing::error!("Failed to store measurement for user {}: {}", user_id, e);
        }

        self.reply(chat_id, &replies::delta(previous, measurement.value)).await;
    }

    async fn reply(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.bot.send_message(chat_id, text).await {
            tracing::error!("Failed to send message to chat {}: {}", chat_id, e);
        }
    }

    async fn timed<T, F>(&self, call: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::timed_out(self.store_timeout)),
        }
    }
}

fn sender_id_or_default(update: &Update) -> i64 {
    update.sender_id().unwrap_or_else(|| {
        tracing::warn!("Can't determine user id of {} in chat {}", update.kind(), update.chat_id());
        0
    })
}
