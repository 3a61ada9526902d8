//! Cache Module
//!
//! Cache-aside provider with read-through population, lifetimes and
//! pattern removal over a pluggable store.

mod expiration;
mod locks;
mod provider;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use expiration::Expiration;
pub use locks::KeyLocks;
pub use provider::CacheProvider;
pub use stats::{ProviderStats, StatsSnapshot};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed pattern length in bytes
pub const MAX_PATTERN_LENGTH: usize = 256;
