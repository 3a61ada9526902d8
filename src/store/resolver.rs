//! Connection Resolver Module
//!
//! Resolves connection settings from configuration once and lazily builds the
//! shared connection, database handle and server handle on first use.

use std::sync::{Arc, OnceLock};

use tokio::sync::OnceCell;
use tracing::{error, info};

use super::redis::{RedisConnection, RedisDatabase, RedisServer, RedisStore};
use crate::config::{Config, ConnectionSettings};
use crate::error::{CacheError, ConfigError, Result};

static GLOBAL: OnceLock<ConnectionResolver> = OnceLock::new();

// == Connection Resolver ==
/// Memoizes the store connection and the handles derived from it.
///
/// Each handle initializes at most once even under concurrent first access.
/// A configuration error is remembered and returned on every access; a failed
/// connection attempt is not cached and the next access tries again.
pub struct ConnectionResolver {
    config: Config,
    settings: OnceLock<std::result::Result<ConnectionSettings, ConfigError>>,
    connection: OnceCell<RedisConnection>,
    database: OnceCell<RedisDatabase>,
    server: OnceCell<RedisServer>,
}

impl ConnectionResolver {
    // == Constructor ==
    pub fn new(config: Config) -> Self {
        Self {
            config,
            settings: OnceLock::new(),
            connection: OnceCell::new(),
            database: OnceCell::new(),
            server: OnceCell::new(),
        }
    }

    /// Returns the process-wide resolver built from environment configuration.
    pub fn global() -> &'static ConnectionResolver {
        GLOBAL.get_or_init(|| ConnectionResolver::new(Config::from_env()))
    }

    /// Returns the configuration this resolver reads from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    // == Settings ==
    /// Parses the configured connection string, once.
    pub fn settings(&self) -> std::result::Result<&ConnectionSettings, ConfigError> {
        self.settings
            .get_or_init(|| {
                let parsed = self.config.connection_settings();
                if let Err(e) = &parsed {
                    error!("Invalid store configuration: {}", e);
                }
                parsed
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    // == Connection ==
    /// Returns the shared connection, connecting on first access.
    pub async fn connection(&self) -> Result<&RedisConnection> {
        let settings = self.settings()?;
        self.connection
            .get_or_try_init(|| async {
                info!("Resolving store connection to {}", settings.endpoint());
                RedisConnection::connect(settings).await.map_err(CacheError::from)
            })
            .await
    }

    // == Database ==
    /// Returns the data command handle.
    pub async fn database(&self) -> Result<&RedisDatabase> {
        self.database
            .get_or_try_init(|| async {
                Ok::<_, CacheError>(self.connection().await?.database())
            })
            .await
    }

    // == Server ==
    /// Returns the administration handle used for key enumeration.
    pub async fn server(&self) -> Result<&RedisServer> {
        self.server
            .get_or_try_init(|| async {
                Ok::<_, CacheError>(self.connection().await?.server())
            })
            .await
    }

    /// Builds a store client over the memoized handles.
    pub async fn store(&self) -> Result<Arc<RedisStore>> {
        let database = self.database().await?.clone();
        let server = self.server().await?.clone();
        Ok(Arc::new(RedisStore::new(database, server)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreClient;

    fn resolver_for(connection_string: &str) -> ConnectionResolver {
        ConnectionResolver::new(Config {
            connection_string: connection_string.to_string(),
            ..Config::default()
        })
    }

    #[test]
    fn test_settings_are_parsed_once() {
        let resolver = resolver_for("cache.local:6380");

        let first = resolver.settings().unwrap() as *const ConnectionSettings;
        let second = resolver.settings().unwrap() as *const ConnectionSettings;

        assert_eq!(first, second);
        assert_eq!(resolver.settings().unwrap().port, 6380);
    }

    #[tokio::test]
    async fn test_configuration_error_surfaces_on_every_access() {
        let resolver = resolver_for("");

        for _ in 0..2 {
            let result = resolver.database().await;
            assert!(matches!(
                result,
                Err(CacheError::Configuration(ConfigError::MissingConnectionString))
            ));
        }
        assert!(matches!(
            resolver.server().await,
            Err(CacheError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_connection_failure_is_not_cached() {
        let resolver = resolver_for("127.0.0.1:1,connectTimeout=200");

        assert!(matches!(resolver.connection().await, Err(CacheError::Store(_))));
        assert!(matches!(resolver.connection().await, Err(CacheError::Store(_))));
    }

    #[tokio::test]
    #[ignore = "requires running Redis instance"]
    async fn test_handles_are_shared() {
        let resolver = resolver_for("127.0.0.1:6379");

        let (a, b) = tokio::join!(resolver.connection(), resolver.connection());
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(std::ptr::eq(a, b));

        let store = resolver.store().await.unwrap();
        store.set("rcp:resolver", "ok", None).await.unwrap();
        assert_eq!(store.get("rcp:resolver").await.unwrap(), Some("ok".to_string()));
        store.delete("rcp:resolver").await.unwrap();
    }
}
