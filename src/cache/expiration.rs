//! Expiration Module
//!
//! Lifetime policies for cache entries.

use std::time::Duration;

// == Expiration ==
/// How long a written entry stays in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiration {
    /// Kept until removed
    #[default]
    None,
    /// Removed by the store once the duration has elapsed after the write
    Exact(Duration),
    /// Written exactly like [`Expiration::Exact`].
    ///
    /// Reads do not extend the lifetime.
    Sliding(Duration),
}

impl Expiration {
    /// Returns the TTL handed to the store.
    pub fn ttl(&self) -> Option<Duration> {
        match *self {
            Expiration::None => None,
            Expiration::Exact(ttl) | Expiration::Sliding(ttl) => Some(ttl),
        }
    }
}
