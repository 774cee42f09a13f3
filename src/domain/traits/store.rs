use async_trait::async_trait;

use crate::application::errors::StorageError;
use crate::domain::entities::{Measurement, User};

/// Store trait - append-only measurement log plus a user registry.
///
/// Implementations serialize concurrent writers themselves.
#[async_trait]
pub trait Store: Send + Sync {
    /// Append a measurement
    async fn put(&self, measurement: &Measurement) -> Result<(), StorageError>;

    /// Value of the most recent measurement for a user.
    ///
    /// Returns `StorageError::NotFound` when the user has no readings yet.
    async fn get_last(&self, user_id: i64) -> Result<i64, StorageError>;

    /// Insert or replace a user keyed by id
    async fn add_user(&self, user: &User) -> Result<(), StorageError>;
}
