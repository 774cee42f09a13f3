//! In-memory storage implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::application::errors::StorageError;
use crate::domain::entities::{Measurement, User};
use crate::domain::traits::Store;

/// Process-local store; contents are lost on exit
#[derive(Clone, Default)]
pub struct MemoryStore {
    measurements: Arc<RwLock<HashMap<i64, Vec<Measurement>>>>,
    users: Arc<RwLock<HashMap<i64, User>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Measurements for a user in insertion order
    pub async fn measurements(&self, user_id: i64) -> Vec<Measurement> {
        let measurements = self.measurements.read().await;
        measurements.get(&user_id).cloned().unwrap_or_default()
    }

    pub async fn measurement_count(&self) -> usize {
        let measurements = self.measurements.read().await;
        measurements.values().map(Vec::len).sum()
    }

    pub async fn user(&self, id: i64) -> Option<User> {
        let users = self.users.read().await;
        users.get(&id).cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put(&self, measurement: &Measurement) -> Result<(), StorageError> {
        let mut measurements = self.measurements.write().await;
        measurements.entry(measurement.user_id)
            .or_insert_with(Vec::new)
            .push(measurement.clone());
        Ok(())
    }

    async fn get_last(&self, user_id: i64) -> Result<i64, StorageError> {
        let measurements = self.measurements.read().await;
        // Latest timestamp wins, ties go to the later insert
        measurements.get(&user_id)
            .and_then(|list| list.iter().max_by_key(|m| m.timestamp))
            .map(|m| m.value)
            .ok_or_else(|| StorageError::NotFound(format!("no measurements for user {}", user_id)))
    }

    async fn add_user(&self, user: &User) -> Result<(), StorageError> {
        let mut users = self.users.write().await;
        users.insert(user.id, user.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn get_last_without_readings_is_not_found() {
        let store = MemoryStore::new();
        let err = store.get_last(1).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn get_last_orders_by_timestamp() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.put(&Measurement::at(now, 1, 4058)).await.unwrap();
        store.put(&Measurement::at(now - Duration::hours(1), 1, 3001)).await.unwrap();
        store.put(&Measurement::at(now, 2, 9999)).await.unwrap();

        assert_eq!(store.get_last(1).await.unwrap(), 4058);
        assert_eq!(store.get_last(2).await.unwrap(), 9999);
        assert_eq!(store.measurement_count().await, 3);
    }

    #[tokio::test]
    async fn equal_timestamps_prefer_latest_insert() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.put(&Measurement::at(now, 1, 100)).await.unwrap();
        store.put(&Measurement::at(now, 1, 200)).await.unwrap();
        assert_eq!(store.get_last(1).await.unwrap(), 200);
    }

    #[tokio::test]
    async fn add_user_replaces_existing_entry() {
        let store = MemoryStore::new();
        store.add_user(&User::new(5, "Old")).await.unwrap();
        store.add_user(&User::new(5, "New").with_username("new_name")).await.unwrap();

        let user = store.user(5).await.unwrap();
        assert_eq!(user.first_name, "New");
        assert_eq!(user.username.as_deref(), Some("new_name"));
    }
}
