//! Store Module
//!
//! Key-value services the cache provider reads from and writes to.

mod memory;
mod pattern;
mod redis;
mod resolver;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

pub use self::redis::{RedisConnection, RedisDatabase, RedisServer, RedisStore};
pub use memory::MemoryStore;
pub use pattern::glob_match;
pub use resolver::ConnectionResolver;

/// A minimal string key-value service with TTLs and pattern enumeration.
///
/// `set` is atomic per key and TTLs are enforced by the store itself.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// A name for logs.
    ///
    /// # Example
    /// - "memory"
    /// - "redis"
    fn name(&self) -> &'static str;

    /// Stores the payload, replacing any previous one.
    ///
    /// With `ttl` the entry expires that long after the write.
    async fn set(&self, key: &str, payload: &str, ttl: Option<Duration>)
        -> Result<(), StoreError>;

    /// Returns the payload, or `None` when the key does not exist.
    ///
    /// An existing empty payload is returned as `Some("")`.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Returns true when the key exists.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Deletes the key, returning whether something was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Lists the keys matching a glob-style pattern.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;
}
