//! SQLite storage implementation

use async_trait::async_trait;
use chrono::SecondsFormat;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::application::errors::StorageError;
use crate::domain::entities::{Measurement, User};
use crate::domain::traits::Store;

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::QueryReturnedNoRows => StorageError::NotFound(e.to_string()),
            other => StorageError::Unavailable(other.to_string()),
        }
    }
}

/// Store backed by a single SQLite connection.
///
/// Calls run on the blocking pool; the connection mutex serializes writers.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        init_tables(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub async fn user(&self, id: i64) -> Result<Option<User>, StorageError> {
        self.with_conn(move |conn| {
            let user = conn.query_row(
                "SELECT id, first_name, last_name, username, language_code, is_bot
                 FROM users WHERE id = ?1",
                [id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                        username: row.get(3)?,
                        language_code: row.get(4)?,
                        is_bot: row.get(5)?,
                    })
                },
            ).optional()?;
            Ok(user)
        }).await
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock()
                .map_err(|_| StorageError::Unavailable("connection lock poisoned".to_string()))?;
            f(&conn)
        })
        .await
        .map_err(|e| StorageError::Unavailable(format!("store task failed: {}", e)))?
    }
}

fn init_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS measurements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL,
            user_id INTEGER NOT NULL,
            value INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT,
            username TEXT,
            language_code TEXT,
            is_bot INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_measurements_user_time ON measurements(user_id, timestamp)",
        [],
    )?;

    Ok(())
}

#[async_trait]
impl Store for SqliteStore {
    async fn put(&self, measurement: &Measurement) -> Result<(), StorageError> {
        // Fixed-width UTC timestamps sort correctly as text
        let timestamp = measurement.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true);
        let user_id = measurement.user_id;
        let value = measurement.value;

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO measurements (timestamp, user_id, value) VALUES (?1, ?2, ?3)",
                params![timestamp, user_id, value],
            )?;
            Ok(())
        }).await
    }

    async fn get_last(&self, user_id: i64) -> Result<i64, StorageError> {
        self.with_conn(move |conn| {
            let value: i64 = conn.query_row(
                "SELECT value FROM measurements WHERE user_id = ?1
                 ORDER BY timestamp DESC, id DESC LIMIT 1",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(value)
        }).await
    }

    async fn add_user(&self, user: &User) -> Result<(), StorageError> {
        let user = user.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO users (id, first_name, last_name, username, language_code, is_bot, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))",
                params![
                    user.id,
                    user.first_name,
                    user.last_name,
                    user.username,
                    user.language_code,
                    user.is_bot
                ],
            )?;
            Ok(())
        }).await
    }
}
