//! Error types for the cache provider
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Store Error ==
/// Failure reported by a store client (network, protocol or backend error).
#[derive(Error, Debug, Clone)]
#[error("[{store}] {operation} failed for '{key}': {message}")]
pub struct StoreError {
    /// Store name ("memory", "redis")
    pub store: &'static str,
    /// Command that failed
    pub operation: &'static str,
    /// Key or pattern the command targeted
    pub key: String,
    /// Backend message
    pub message: String,
}

impl StoreError {
    /// Creates a new store error.
    pub fn new(
        store: &'static str,
        operation: &'static str,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            store,
            operation,
            key: key.into(),
            message: message.into(),
        }
    }
}

// == Codec Error ==
/// Serialization failures raised by the codec.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The value could not be encoded
    #[error("Serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The payload could not be decoded as the requested type
    #[error("Deserialization as {type_name} failed: {source}")]
    Deserialize {
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A registered custom reader rejected a tagged object
    #[error("Reader for '{type_id}' failed: {message}")]
    Reader { type_id: String, message: String },
}

// == Config Error ==
/// Missing or malformed connection settings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No connection string configured
    #[error("Connection string is empty")]
    MissingConnectionString,

    /// The connection string could not be parsed
    #[error("Invalid connection string '{input}': {reason}")]
    InvalidConnectionString { input: String, reason: String },
}

// == Cache Error Enum ==
/// Unified error type for the cache provider.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Store command failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Payload could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The caller supplied value factory failed
    #[error("Supplier failed: {0}")]
    Supplier(#[source] anyhow::Error),

    /// Connection settings are missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Codec(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CacheError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Supplier(_) | CacheError::Configuration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match self {
            CacheError::InvalidRequest(msg) => msg,
            other => other.to_string(),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache provider.
pub type Result<T> = std::result::Result<T, CacheError>;
