//! Redis Store Module
//!
//! Store client backed by a Redis server through one multiplexed connection.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{debug, info};

use super::StoreClient;
use crate::config::ConnectionSettings;
use crate::error::StoreError;

const STORE_NAME: &str = "redis";

/// Keys requested per SCAN round trip.
const SCAN_BATCH: usize = 500;

// == Connection ==
/// An established connection to one Redis endpoint.
///
/// The multiplexed connection is cheap to clone; every handle derived from it
/// shares the same socket.
#[derive(Clone)]
pub struct RedisConnection {
    connection: MultiplexedConnection,
    endpoint: String,
}

impl RedisConnection {
    /// Connects using the parsed settings.
    ///
    /// # Returns
    /// * `Ok(RedisConnection)` - Successfully connected
    /// * `Err(StoreError)` - Client creation, connection or timeout failure
    pub async fn connect(settings: &ConnectionSettings) -> Result<Self, StoreError> {
        let endpoint = settings.endpoint();
        let client = redis::Client::open(settings.url().as_str()).map_err(|e| {
            StoreError::new(STORE_NAME, "CONNECT", &endpoint, format!("invalid client: {}", e))
        })?;

        let connecting = client.get_multiplexed_async_connection();
        let connected = match settings.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, connecting).await.map_err(|_| {
                StoreError::new(
                    STORE_NAME,
                    "CONNECT",
                    &endpoint,
                    format!("timed out after {}ms", limit.as_millis()),
                )
            })?,
            None => connecting.await,
        };
        let connection = connected
            .map_err(|e| StoreError::new(STORE_NAME, "CONNECT", &endpoint, e.to_string()))?;

        info!("Connected to redis at {}", endpoint);
        Ok(Self {
            connection,
            endpoint,
        })
    }

    /// Returns the `host:port` this connection talks to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Creates the data command handle.
    pub fn database(&self) -> RedisDatabase {
        RedisDatabase {
            connection: self.connection.clone(),
        }
    }

    /// Creates the administration handle used for key enumeration.
    pub fn server(&self) -> RedisServer {
        RedisServer {
            connection: self.connection.clone(),
            endpoint: self.endpoint.clone(),
        }
    }
}

/// Converts a TTL to the millisecond argument of `PSETEX`.
///
/// Returns `None` when the TTL rounds down to zero milliseconds. Longer TTLs
/// are clamped to the largest expire time Redis accepts.
fn expire_millis(ttl: Duration) -> Option<u64> {
    let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
    match millis {
        0 => None,
        millis => Some(millis.min(i64::MAX as u64)),
    }
}

// == Database ==
/// Handle issuing per-key data commands.
#[derive(Clone)]
pub struct RedisDatabase {
    connection: MultiplexedConnection,
}

impl RedisDatabase {
    pub async fn set(&self, key: &str, payload: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        match ttl.map(expire_millis) {
            // Redis rejects a zero expire time; the entry would be gone already
            Some(None) => {
                self.delete(key).await?;
            }
            Some(Some(millis)) => {
                let _: () = conn
                    .pset_ex(key, payload, millis)
                    .await
                    .map_err(|e| StoreError::new(STORE_NAME, "PSETEX", key, e.to_string()))?;
            }
            None => {
                let _: () = conn
                    .set(key, payload)
                    .await
                    .map_err(|e| StoreError::new(STORE_NAME, "SET", key, e.to_string()))?;
            }
        }
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection.clone();
        conn.get(key)
            .await
            .map_err(|e| StoreError::new(STORE_NAME, "GET", key, e.to_string()))
    }

    pub async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        conn.exists(key)
            .await
            .map_err(|e| StoreError::new(STORE_NAME, "EXISTS", key, e.to_string()))
    }

    pub async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        let deleted: i64 = conn
            .del(key)
            .await
            .map_err(|e| StoreError::new(STORE_NAME, "DEL", key, e.to_string()))?;
        Ok(deleted > 0)
    }
}

// == Server ==
/// Handle issuing server-wide commands.
#[derive(Clone)]
pub struct RedisServer {
    connection: MultiplexedConnection,
    endpoint: String,
}

impl RedisServer {
    /// Lists keys matching `pattern` with incremental SCAN.
    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connection.clone();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| StoreError::new(STORE_NAME, "SCAN", pattern, e.to_string()))?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return a key more than once
        keys.sort();
        keys.dedup();
        debug!(
            "SCAN {} on {} matched {} keys",
            pattern,
            self.endpoint,
            keys.len()
        );
        Ok(keys)
    }
}

// == Redis Store ==
/// [`StoreClient`] over a database handle and a server handle.
#[derive(Clone)]
pub struct RedisStore {
    database: RedisDatabase,
    server: RedisServer,
}

impl RedisStore {
    pub fn new(database: RedisDatabase, server: RedisServer) -> Self {
        Self { database, server }
    }

    /// Connects and builds both handles on the same connection.
    ///
    /// # Example
    /// ```ignore
    /// let settings = ConnectionSettings::parse("127.0.0.1:6379,abortConnect=false")?;
    /// let store = RedisStore::connect(&settings).await?;
    /// ```
    pub async fn connect(settings: &ConnectionSettings) -> Result<Self, StoreError> {
        let connection = RedisConnection::connect(settings).await?;
        Ok(Self::new(connection.database(), connection.server()))
    }
}

#[async_trait]
impl StoreClient for RedisStore {
    fn name(&self) -> &'static str {
        STORE_NAME
    }

    async fn set(
        &self,
        key: &str,
        payload: &str,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        self.database.set(key, payload, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.database.get(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.database.exists(key).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.database.delete(key).await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        self.server.keys(pattern).await
    }
}
