//! Cache Provider Module
//!
//! Typed cache-aside API over a [`StoreClient`]: writes with optional
//! lifetimes, reads, removal, and read-through population that runs a
//! supplier at most once per key while its lock is held.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, warn};

use crate::cache::{Expiration, KeyLocks, ProviderStats, StatsSnapshot};
use crate::codec::Codec;
use crate::error::{CacheError, Result};
use crate::store::StoreClient;

// == Cache Provider ==
/// Cache provider shared by every caller of a process.
///
/// Mutating operations and read-through population take the write lock of
/// the key's stripe; `get` and `contains` never lock. Write and delete
/// failures are logged and swallowed so a broken cache never fails the
/// caller. The store handle is shared and never closed by the provider;
/// dropping the provider releases only its locks.
pub struct CacheProvider {
    store: Arc<dyn StoreClient>,
    codec: Codec,
    locks: KeyLocks,
    stats: ProviderStats,
}

impl CacheProvider {
    // == Constructor ==
    /// Creates a provider with the default codec and one lock for all keys.
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        Self {
            store,
            codec: Codec::default(),
            locks: KeyLocks::coarse(),
            stats: ProviderStats::new(),
        }
    }

    /// Replaces the codec.
    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Stripes the population lock over `stripes` locks.
    pub fn with_lock_stripes(mut self, stripes: usize) -> Self {
        self.locks = KeyLocks::new(stripes);
        self
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn store(&self) -> &Arc<dyn StoreClient> {
        &self.store
    }

    /// Returns the number of lock stripes.
    pub fn lock_stripes(&self) -> usize {
        self.locks.len()
    }

    /// Returns a copy of the provider counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    // == Add ==
    /// Stores a value with no expiration.
    pub async fn add<T>(&self, key: &str, value: &T)
    where
        T: Serialize + ?Sized,
    {
        self.add_with_expiration(key, value, Expiration::None).await
    }

    /// Stores a value that expires `ttl` after the write.
    pub async fn add_with_exact_lifetime<T>(&self, key: &str, value: &T, ttl: Duration)
    where
        T: Serialize + ?Sized,
    {
        self.add_with_expiration(key, value, Expiration::Exact(ttl))
            .await
    }

    /// Stores a value with a sliding lifetime.
    ///
    /// The store cannot refresh a TTL on read, so this behaves exactly like
    /// [`CacheProvider::add_with_exact_lifetime`].
    pub async fn add_with_sliding_lifetime<T>(&self, key: &str, value: &T, ttl: Duration)
    where
        T: Serialize + ?Sized,
    {
        self.add_with_expiration(key, value, Expiration::Sliding(ttl))
            .await
    }

    /// Stores a value with the given expiration policy.
    pub async fn add_with_expiration<T>(&self, key: &str, value: &T, expiration: Expiration)
    where
        T: Serialize + ?Sized,
    {
        let _guard = self.locks.write(key).await;
        match self.codec.serialize(value) {
            Ok(payload) => self.write_payload("add", key, &payload, expiration).await,
            Err(e) => self.swallow("add", key, &e.into()),
        }
    }

    // == Get ==
    /// Returns the value stored under `key`.
    ///
    /// A missing key, an expired entry or an empty payload yields `Ok(None)`.
    /// A payload that does not decode as `T` is an error.
    pub async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let value = self.read(key).await?;
        match value {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        Ok(value)
    }

    // == Contains ==
    /// Returns true when the store holds `key`.
    pub async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.store.exists(key).await?)
    }

    // == Remove ==
    /// Deletes `key`. Removing an absent key does nothing.
    pub async fn remove(&self, key: &str) {
        let _guard = self.locks.write(key).await;
        match self.store.delete(key).await {
            Ok(true) => {
                self.stats.record_removed(1);
                debug!("Removed {}", key);
            }
            Ok(false) => debug!("Remove of absent key {}", key),
            Err(e) => self.swallow("remove", key, &e.into()),
        }
    }

    // == Remove Key With Pattern ==
    /// Deletes every key matching the glob `pattern`.
    ///
    /// Stops at the first failed delete; keys after it stay in the store.
    /// Returns the number of keys deleted.
    pub async fn remove_key_with_pattern(&self, pattern: &str) -> usize {
        let _guards = self.locks.write_all().await;

        let keys = match self.store.keys(pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                self.swallow("remove_key_with_pattern", pattern, &e.into());
                return 0;
            }
        };

        let mut removed = 0;
        for key in &keys {
            match self.store.delete(key).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => {
                    self.swallow("remove_key_with_pattern", key, &e.into());
                    warn!(
                        "Pattern {} aborted after {} of {} keys",
                        pattern,
                        removed,
                        keys.len()
                    );
                    break;
                }
            }
        }

        self.stats.record_removed(removed as u64);
        debug!("Pattern {} removed {} keys", pattern, removed);
        removed
    }

    // == Ensure ==
    /// Returns the cached value, or runs `supplier` and caches its result
    /// with no expiration.
    pub async fn ensure<T, F, Fut>(&self, key: &str, supplier: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        self.ensure_with_expiration(key, Expiration::None, supplier)
            .await
    }

    /// Like [`CacheProvider::ensure`], caching the result for `ttl`.
    pub async fn ensure_with_exact_lifetime<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        supplier: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        self.ensure_with_expiration(key, Expiration::Exact(ttl), supplier)
            .await
    }

    /// Like [`CacheProvider::ensure_with_exact_lifetime`]; reads do not
    /// extend the lifetime.
    pub async fn ensure_with_sliding_lifetime<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        supplier: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        self.ensure_with_expiration(key, Expiration::Sliding(ttl), supplier)
            .await
    }

    /// Read-through with an explicit expiration policy.
    ///
    /// 1. Read without locking; a hit returns immediately.
    /// 2. On a miss take the key's write lock and read again, since another
    ///    caller may have populated the key while this one waited.
    /// 3. Still missing: run `supplier` once and write its result unless it
    ///    is null. A failed write is logged; the value is still returned.
    ///
    /// Supplier errors propagate as [`CacheError::Supplier`]; the lock is
    /// released on every path when the guard drops.
    pub async fn ensure_with_expiration<T, F, Fut>(
        &self,
        key: &str,
        expiration: Expiration,
        supplier: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if let Some(cached) = self.read(key).await? {
            self.stats.record_hit();
            return Ok(cached);
        }
        self.stats.record_miss();

        let _guard = self.locks.write(key).await;

        if let Some(cached) = self.read(key).await? {
            debug!("{} was populated while waiting for the lock", key);
            return Ok(cached);
        }

        self.stats.record_supplier_call();
        let value = supplier().await.map_err(CacheError::Supplier)?;
        self.write_produced("ensure", key, &value, expiration).await;
        Ok(value)
    }

    // == Update With Sliding Lifetime ==
    /// Always runs `supplier`, caches a non-null result for `ttl` and returns
    /// it whatever the cache held before.
    pub async fn update_with_sliding_lifetime<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        supplier: F,
    ) -> Result<T>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        self.stats.record_supplier_call();
        let value = supplier().await.map_err(CacheError::Supplier)?;

        let _guard = self.locks.write(key).await;
        self.write_produced("update", key, &value, Expiration::Sliding(ttl))
            .await;
        Ok(value)
    }

    // == Internal ==
    async fn read<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let Some(payload) = self.store.get(key).await? else {
            return Ok(None);
        };
        if Codec::is_null_payload(&payload) {
            return Ok(None);
        }
        Ok(Some(self.codec.deserialize(&payload)?))
    }

    /// Writes a supplier result; null results are returned but not cached.
    /// Caller holds the key's lock.
    async fn write_produced<T>(
        &self,
        operation: &'static str,
        key: &str,
        value: &T,
        expiration: Expiration,
    ) where
        T: Serialize,
    {
        match self.codec.serialize(value) {
            Ok(payload) if Codec::is_null_payload(&payload) => {
                debug!("Supplier for {} produced no value, nothing cached", key)
            }
            Ok(payload) => {
                self.write_payload(operation, key, &payload, expiration)
                    .await
            }
            Err(e) => self.swallow(operation, key, &e.into()),
        }
    }

    /// Caller holds the key's lock.
    async fn write_payload(
        &self,
        operation: &'static str,
        key: &str,
        payload: &str,
        expiration: Expiration,
    ) {
        match self.store.set(key, payload, expiration.ttl()).await {
            Ok(()) => debug!("Cached {} ({:?})", key, expiration),
            Err(e) => self.swallow(operation, key, &e.into()),
        }
    }

    fn swallow(&self, operation: &str, key: &str, error: &CacheError) {
        self.stats.record_write_failure();
        error!("cache provider failure: {} {}: {}", operation, key, error);
    }
}

impl fmt::Debug for CacheProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheProvider")
            .field("store", &self.store.name())
            .field("codec", &self.codec)
            .field("lock_stripes", &self.locks.len())
            .finish()
    }
}

impl Drop for CacheProvider {
    fn drop(&mut self) {
        debug!(
            "Cache provider over {} released {} lock stripes",
            self.store.name(),
            self.locks.len()
        );
    }
}
