//! Redis Cache Provider - cache-aside access to Redis with typed values
//!
//! Stores serialized values under string keys with optional lifetimes,
//! removes keys one at a time or by glob pattern, and populates missing keys
//! through a read-through path that runs the value supplier at most once per
//! key even under concurrent callers.

pub mod api;
pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheProvider, Expiration};
pub use codec::{BackRef, Codec, TypeRegistry};
pub use config::Config;
pub use error::{CacheError, Result};
pub use store::{ConnectionResolver, MemoryStore, StoreClient};
pub use tasks::spawn_cleanup_task;
