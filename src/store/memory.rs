//! Memory Store Module
//!
//! In-process store with per-entry TTL, used for tests and single-node setups.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::pattern::glob_match;
use super::StoreClient;
use crate::error::StoreError;

// == Stored Value ==
#[derive(Debug, Clone)]
struct StoredValue {
    payload: String,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    expires_at: Option<u64>,
}

impl StoredValue {
    fn new(payload: String, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.map(|ttl| {
            let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
            current_timestamp_ms().saturating_add(millis)
        });
        Self {
            payload,
            expires_at,
        }
    }

    /// An entry is expired once the current time reaches its expiration time.
    fn is_expired_at(&self, now: u64) -> bool {
        matches!(self.expires_at, Some(expires) if now >= expires)
    }
}

// == Memory Store ==
/// Thread-safe in-memory store.
///
/// Expired entries are dropped lazily on access and by [`MemoryStore::purge_expired`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoredValue>>,
}

impl MemoryStore {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Purge Expired ==
    /// Removes all expired entries.
    ///
    /// Returns the number of entries removed.
    pub async fn purge_expired(&self) -> usize {
        let now = current_timestamp_ms();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, value| !value.is_expired_at(now));
        before - entries.len()
    }

    // == Expires In ==
    /// Returns the remaining lifetime of a live entry with a TTL.
    pub async fn expires_in(&self, key: &str) -> Option<Duration> {
        let now = current_timestamp_ms();
        let entries = self.entries.read().await;
        let value = entries.get(key).filter(|v| !v.is_expired_at(now))?;
        value
            .expires_at
            .map(|expires| Duration::from_millis(expires.saturating_sub(now)))
    }

    // == Length ==
    /// Returns the number of stored entries, expired ones included until purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Returns the live value, removing it first if it has expired.
    async fn live(&self, key: &str) -> Option<StoredValue> {
        let now = current_timestamp_ms();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(value) if !value.is_expired_at(now) => return Some(value.clone()),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|v| v.is_expired_at(now)) {
            entries.remove(key);
        }
        None
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn set(
        &self,
        key: &str,
        payload: &str,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let value = StoredValue::new(payload.to_string(), ttl);
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.live(key).await.map(|v| v.payload))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.live(key).await.is_some())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let now = current_timestamp_ms();
        let removed = self.entries.write().await.remove(key);
        Ok(removed.is_some_and(|v| !v.is_expired_at(now)))
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let now = current_timestamp_ms();
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(key, value)| !value.is_expired_at(now) && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
