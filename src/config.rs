//! Configuration Module
//!
//! Handles loading the provider configuration from environment variables and
//! parsing store connection strings.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use crate::error::ConfigError;

/// Default Redis port when the endpoint does not name one.
pub const DEFAULT_REDIS_PORT: u16 = 6379;

// == Backend ==
/// Store backing the cache provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Remote Redis server
    Redis,
    /// In-process store
    Memory,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Backend::Redis),
            "memory" => Ok(Backend::Memory),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// Provider and server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Store address plus optional inline options
    pub connection_string: String,
    /// Options appended to the connection string
    pub additional_options: Option<String>,
    /// Which store to use
    pub backend: Backend,
    /// Number of lock stripes (1 = one lock for all keys)
    pub lock_stripes: usize,
    /// HTTP server port
    pub server_port: u16,
    /// Memory store cleanup interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_CONNECTION_STRING` - Store address (default: 127.0.0.1:6379)
    /// - `REDIS_ADDITIONAL_OPTIONS` - Extra options, e.g. `password=x,ssl=true`
    /// - `CACHE_BACKEND` - `redis` or `memory` (default: redis)
    /// - `LOCK_STRIPES` - Lock stripes for read-through population (default: 1)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Memory store cleanup frequency in seconds (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            connection_string: env::var("REDIS_CONNECTION_STRING")
                .unwrap_or(defaults.connection_string),
            additional_options: env::var("REDIS_ADDITIONAL_OPTIONS")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            backend: env::var("CACHE_BACKEND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.backend),
            lock_stripes: env::var("LOCK_STRIPES")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.lock_stripes),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            cleanup_interval: env::var("CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cleanup_interval),
        }
    }

    /// Returns the connection string with the additional options appended.
    pub fn connection_string_with_options(&self) -> String {
        match self.additional_options.as_deref() {
            Some(options) if !options.is_empty() => {
                format!("{},{}", self.connection_string, options)
            }
            _ => self.connection_string.clone(),
        }
    }

    /// Parses the full connection string.
    pub fn connection_settings(&self) -> Result<ConnectionSettings, ConfigError> {
        ConnectionSettings::parse(&self.connection_string_with_options())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection_string: format!("127.0.0.1:{}", DEFAULT_REDIS_PORT),
            additional_options: None,
            backend: Backend::Redis,
            lock_stripes: 1,
            server_port: 3000,
            cleanup_interval: 1,
        }
    }
}

// == Connection Settings ==
/// Parsed store connection parameters.
///
/// Accepts a `redis://` / `rediss://` URL or `host[:port]`, followed by
/// comma separated `option=value` pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: bool,
    pub database: i64,
    pub connect_timeout: Option<Duration>,
}

impl ConnectionSettings {
    // == Parse ==
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidConnectionString {
            input: input.to_string(),
            reason,
        };

        let mut parts = input.split(',').map(str::trim).filter(|p| !p.is_empty());
        let endpoint = parts.next().ok_or(ConfigError::MissingConnectionString)?;
        if endpoint.contains('=') {
            return Err(invalid("no endpoint before options".to_string()));
        }

        let mut settings = if endpoint.starts_with("redis://") || endpoint.starts_with("rediss://")
        {
            Self::from_url(endpoint).map_err(invalid)?
        } else {
            Self::from_endpoint(endpoint).map_err(invalid)?
        };

        for part in parts {
            let Some((name, value)) = part.split_once('=') else {
                debug!("Ignoring additional endpoint '{}'", part);
                continue;
            };
            let value = value.trim();
            match name.trim().to_ascii_lowercase().as_str() {
                "password" => settings.password = Some(value.to_string()),
                "user" => settings.username = Some(value.to_string()),
                "ssl" => {
                    settings.tls = value
                        .parse()
                        .map_err(|_| invalid(format!("ssl expects true/false, got '{}'", value)))?
                }
                "defaultdatabase" => {
                    settings.database = value.parse().map_err(|_| {
                        invalid(format!("defaultDatabase expects a number, got '{}'", value))
                    })?
                }
                "connecttimeout" => {
                    let millis: u64 = value.parse().map_err(|_| {
                        invalid(format!("connectTimeout expects milliseconds, got '{}'", value))
                    })?;
                    settings.connect_timeout = Some(Duration::from_millis(millis));
                }
                // The multiplexed client reconnects lazily and has no client name
                "abortconnect" | "name" => {
                    debug!("Connection option '{}' has no effect", name.trim())
                }
                other => debug!("Ignoring connection option '{}'", other),
            }
        }

        Ok(settings)
    }

    fn from_endpoint(endpoint: &str) -> Result<Self, String> {
        let (host, port) = if let Some(rest) = endpoint.strip_prefix('[') {
            // [ipv6]:port
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| "unterminated IPv6 address".to_string())?;
            let port = match tail.strip_prefix(':') {
                Some(port) => Some(port),
                None if tail.is_empty() => None,
                None => return Err(format!("unexpected '{}' after address", tail)),
            };
            (host, port)
        } else {
            match endpoint.rsplit_once(':') {
                Some((host, _)) if host.contains(':') => {
                    return Err("IPv6 addresses must be bracketed, e.g. [::1]:6379".to_string())
                }
                Some((host, port)) => (host, Some(port)),
                None => (endpoint, None),
            }
        };

        if host.is_empty() {
            return Err("empty host".to_string());
        }
        let port = match port {
            Some(port) => port
                .parse()
                .map_err(|_| format!("invalid port '{}'", port))?,
            None => DEFAULT_REDIS_PORT,
        };

        Ok(Self {
            host: host.to_string(),
            port,
            username: None,
            password: None,
            tls: false,
            database: 0,
            connect_timeout: None,
        })
    }

    fn from_url(url: &str) -> Result<Self, String> {
        let parsed = redis::parse_redis_url(url).ok_or_else(|| "malformed redis url".to_string())?;
        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| "url has no host".to_string())?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let database = match parsed.path().trim_matches('/') {
            "" => 0,
            db => db
                .parse()
                .map_err(|_| format!("invalid database '{}'", db))?,
        };

        Ok(Self {
            host,
            port: parsed.port().unwrap_or(DEFAULT_REDIS_PORT),
            username: Some(parsed.username())
                .filter(|u| !u.is_empty())
                .map(str::to_string),
            password: parsed.password().map(str::to_string),
            tls: parsed.scheme() == "rediss",
            database,
            connect_timeout: None,
        })
    }

    // == Url ==
    /// Renders the settings as a redis URL.
    pub fn url(&self) -> String {
        let scheme = if self.tls { "rediss" } else { "redis" };
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        let auth = match (&self.username, &self.password) {
            (Some(user), Some(pass)) => format!("{}:{}@", encode_userinfo(user), encode_userinfo(pass)),
            (None, Some(pass)) => format!(":{}@", encode_userinfo(pass)),
            (Some(user), None) => format!("{}@", encode_userinfo(user)),
            (None, None) => String::new(),
        };
        format!("{}://{}{}:{}/{}", scheme, auth, host, self.port, self.database)
    }

    /// Returns `host:port` for logs, without credentials.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Percent-encodes everything but unreserved characters.
fn encode_userinfo(raw: &str) -> String {
    raw.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}
