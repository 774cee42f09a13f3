//! Telegram adapter

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use crate::application::errors::BotError;
use crate::domain::entities;
use crate::domain::traits::{Bot, BotInfo};

/// Telegram API base URL
const API_BASE: &str = "https://api.telegram.org";

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Telegram update type
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<MessageEntity>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: i64,
    pub length: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

impl Message {
    /// Telegram marks commands with a `bot_command` entity at offset 0
    pub fn is_command(&self) -> bool {
        self.entities.iter().any(|e| e.kind == "bot_command" && e.offset == 0)
    }
}

impl From<User> for entities::User {
    fn from(user: User) -> Self {
        entities::User {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            language_code: user.language_code,
            is_bot: user.is_bot,
        }
    }
}

impl Update {
    /// Convert into a domain update; `None` for update kinds the bot ignores
    pub fn into_domain(self) -> Option<entities::Update> {
        if let Some(msg) = self.message {
            let is_command = msg.is_command();
            return Some(entities::Update::Message {
                chat_id: msg.chat.id,
                from: msg.from.map(Into::into),
                text: msg.text.unwrap_or_default(),
                is_command,
            });
        }

        if let Some(cb) = self.callback_query {
            // Without the originating message, reply in the sender's private chat
            let chat_id = cb.message.as_ref().map(|m| m.chat.id).unwrap_or(cb.from.id);
            return Some(entities::Update::Callback {
                chat_id,
                from: Some(cb.from.into()),
                data: cb.data.unwrap_or_default(),
            });
        }

        None
    }
}

/// Next getUpdates offset; never moves backwards
pub fn next_offset(current: i64, updates: &[Update]) -> i64 {
    updates.iter()
        .map(|u| u.update_id + 1)
        .fold(current, i64::max)
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Telegram bot adapter using getUpdates long polling
pub struct TelegramAdapter {
    token: String,
    client: Client,
    info: BotInfo,
    poll_timeout_secs: u64,
    offset: i64,
    pending: VecDeque<entities::Update>,
    backoff: Duration,
}

impl TelegramAdapter {
    pub fn new(token: impl Into<String>, proxy: Option<&str>, poll_timeout_secs: u64) -> Result<Self, BotError> {
        // The HTTP timeout has to outlive the long-poll window
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + 10));

        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| BotError::Network(format!("invalid proxy {}: {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build()
            .map_err(|e| BotError::Network(e.to_string()))?;

        Ok(Self {
            token: token.into(),
            client,
            info: BotInfo {
                id: 0,
                name: "baby-bot".to_string(),
                username: "baby_bot".to_string(),
            },
            poll_timeout_secs,
            offset: 0,
            pending: VecDeque::new(),
            backoff: INITIAL_BACKOFF,
        })
    }

    /// Get the API URL for a method
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", API_BASE, self.token, method)
    }

    async fn call<R, T>(&self, method: &str, request: &R) -> Result<T, BotError>
    where
        R: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.client
            .post(self.api_url(method))
            .json(request)
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        let status = response.status();
        let data: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| BotError::Parse(format!("{} ({}): {}", method, status, e)))?;

        match data {
            ApiResponse { ok: true, result: Some(result), .. } => Ok(result),
            ApiResponse { description, .. } => Err(BotError::Api(format!(
                "{} failed ({}): {}",
                method,
                status,
                description.unwrap_or_else(|| "no description".to_string())
            ))),
        }
    }

    /// Remove any webhook so that getUpdates is allowed
    pub async fn delete_webhook(&self) -> Result<(), BotError> {
        #[derive(Serialize)]
        struct DeleteWebhookRequest {
            drop_pending_updates: bool,
        }

        let _: bool = self.call("deleteWebhook", &DeleteWebhookRequest { drop_pending_updates: false }).await?;
        Ok(())
    }

    /// Fetch bot info from Telegram API
    pub async fn fetch_bot_info(&mut self) -> Result<(), BotError> {
        #[derive(Deserialize)]
        struct BotInfoResponse {
            id: i64,
            first_name: String,
            username: String,
        }

        let data: BotInfoResponse = self.call("getMe", &serde_json::json!({})).await?;

        self.info = BotInfo {
            id: data.id,
            name: data.first_name,
            username: data.username,
        };

        Ok(())
    }

    /// Publish the command menu shown by Telegram clients
    pub async fn register_commands(&self, commands: &[(String, String)]) -> Result<(), BotError> {
        #[derive(Serialize)]
        struct BotCommand<'a> {
            command: &'a str,
            description: &'a str,
        }

        #[derive(Serialize)]
        struct SetMyCommandsRequest<'a> {
            commands: Vec<BotCommand<'a>>,
        }

        let request = SetMyCommandsRequest {
            commands: commands.iter()
                .map(|(command, description)| BotCommand { command, description })
                .collect(),
        };

        let _: bool = self.call("setMyCommands", &request).await?;
        tracing::info!("Registered {} bot commands with Telegram", commands.len());
        Ok(())
    }

    /// Get updates from Telegram using getUpdates API
    pub async fn get_updates(&self, offset: i64, timeout: u64) -> Result<Vec<Update>, BotError> {
        #[derive(Serialize)]
        struct GetUpdatesRequest {
            offset: i64,
            timeout: u64,
            allowed_updates: Vec<String>,
        }

        let request = GetUpdatesRequest {
            offset,
            timeout,
            allowed_updates: vec!["message".to_string(), "callback_query".to_string()],
        };

        self.call("getUpdates", &request).await
    }

    async fn poll(&mut self) {
        match self.get_updates(self.offset, self.poll_timeout_secs).await {
            Ok(updates) => {
                self.backoff = INITIAL_BACKOFF;
                if !updates.is_empty() {
                    tracing::debug!("Received {} updates", updates.len());
                }
                self.offset = next_offset(self.offset, &updates);
                self.pending.extend(updates.into_iter().filter_map(Update::into_domain));
            }
            Err(e) => {
                tracing::error!("Failed to get updates: {}, retrying in {:?}", e, self.backoff);
                tokio::time::sleep(self.backoff).await;
                self.backoff = (self.backoff * 2).min(MAX_BACKOFF);
            }
        }
    }
}

#[async_trait]
impl Bot for TelegramAdapter {
    async fn next_update(&mut self) -> Option<entities::Update> {
        loop {
            if let Some(update) = self.pending.pop_front() {
                return Some(update);
            }
            self.poll().await;
        }
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), BotError> {
        #[derive(Serialize)]
        struct SendMessageRequest<'a> {
            chat_id: i64,
            text: &'a str,
        }

        #[derive(Deserialize)]
        struct MessageResult {
            message_id: i64,
        }

        tracing::debug!("Sending to {}: {}", chat_id, text);
        let sent: MessageResult = self.call("sendMessage", &SendMessageRequest { chat_id, text }).await?;
        tracing::debug!("Delivered message {} to chat {}", sent.message_id, chat_id);
        Ok(())
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}
