//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::application::errors::ConfigError;

/// Bot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub telegram: TelegramConfig,
    pub store: StoreConfig,
    pub keep_alive: KeepAliveConfig,
    pub debug: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    /// Long-polling timeout passed to getUpdates
    pub poll_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TelegramConfig {
    pub token: Option<String>,
    /// Proxy URL, e.g. `socks5://127.0.0.1:1080`
    pub proxy: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreKind {
    Sqlite,
    Memory,
}

impl FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(StoreKind::Sqlite),
            "memory" => Ok(StoreKind::Memory),
            _ => Err(ConfigError::InvalidValue {
                key: "STORE_TYPE".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub path: PathBuf,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct KeepAliveConfig {
    /// Port for the HTTP responder; disabled when unset
    pub port: Option<u16>,
    /// URL pinged periodically; disabled when unset
    pub service_url: Option<String>,
    pub interval_secs: u64,
    pub response_text: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            poll_timeout_secs: 60,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Sqlite,
            path: PathBuf::from("baby-bot.db"),
            timeout_secs: 5,
        }
    }
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            port: None,
            service_url: None,
            interval_secs: 600,
            response_text: "Hi there!".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_lookup(|key| std::env::var(key).ok())
    }

    /// Overlay values from a key lookup; empty values count as unset
    pub fn apply_lookup<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("TELEGRAM_TOKEN") {
            self.telegram.token = Some(token);
        }
        if let Some(proxy) = get("TELEGRAM_PROXY") {
            self.telegram.proxy = Some(proxy);
        }
        if let Some(kind) = get("STORE_TYPE") {
            self.store.kind = kind.parse()?;
        }
        if let Some(path) = get("DATABASE_PATH") {
            self.store.path = PathBuf::from(path);
        }
        if let Some(secs) = get("STORE_TIMEOUT_SECS") {
            self.store.timeout_secs = parse_value("STORE_TIMEOUT_SECS", &secs)?;
        }
        if let Some(port) = get("PORT") {
            self.keep_alive.port = Some(parse_value("PORT", &port)?);
        }
        if let Some(url) = get("SERVICE_URL") {
            self.keep_alive.service_url = Some(url);
        }
        if let Some(debug) = get("DEBUG") {
            self.debug = parse_bool("DEBUG", &debug)?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.kind == StoreKind::Sqlite && self.store.path.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("store.path".to_string()));
        }
        if self.store.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "store.timeout-secs".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store.timeout_secs)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
