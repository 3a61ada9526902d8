//! Request DTOs for the cache gateway API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::cache::{Expiration, MAX_KEY_LENGTH, MAX_PATTERN_LENGTH};

/// Request body for storing an entry (PUT /entries/:key)
///
/// # Fields
/// - `value`: Any JSON value
/// - `ttl`: Optional lifetime in seconds (kept until removed if absent)
/// - `sliding`: Marks the lifetime as sliding; stored the same as exact
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The value to store
    pub value: Value,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default)]
    pub sliding: Option<bool>,
}

impl SetRequest {
    /// Returns the expiration policy described by the request.
    pub fn expiration(&self) -> Expiration {
        match (self.ttl, self.sliding.unwrap_or(false)) {
            (None, _) => Expiration::None,
            (Some(secs), false) => Expiration::Exact(Duration::from_secs(secs)),
            (Some(secs), true) => Expiration::Sliding(Duration::from_secs(secs)),
        }
    }

    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.sliding == Some(true) && self.ttl.is_none() {
            return Some("Sliding lifetime requires a ttl".to_string());
        }
        None
    }
}

/// Query string for pattern removal (DELETE /entries?pattern=...)
#[derive(Debug, Clone, Deserialize)]
pub struct PatternQuery {
    /// Glob pattern, e.g. `user:*`
    pub pattern: String,
}

impl PatternQuery {
    pub fn validate(&self) -> Option<String> {
        if self.pattern.is_empty() {
            return Some("Pattern cannot be empty".to_string());
        }
        if self.pattern.len() > MAX_PATTERN_LENGTH {
            return Some(format!(
                "Pattern exceeds maximum length of {} characters",
                MAX_PATTERN_LENGTH
            ));
        }
        None
    }
}

/// Validates a key taken from the request path.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} characters",
            MAX_KEY_LENGTH
        ));
    }
    None
}
