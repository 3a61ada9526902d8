//! Key Locks Module
//!
//! Write locks serializing mutations and read-through population.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tokio::sync::{RwLock, RwLockWriteGuard};

// == Key Locks ==
/// A fixed set of lock stripes; every key maps to exactly one stripe.
///
/// With a single stripe all keys share one lock. More stripes let misses on
/// unrelated keys populate concurrently; two callers on the same key always
/// contend on the same stripe.
#[derive(Debug)]
pub struct KeyLocks {
    stripes: Vec<RwLock<()>>,
}

impl KeyLocks {
    // == Constructor ==
    /// Creates `stripes` locks (at least one).
    pub fn new(stripes: usize) -> Self {
        Self {
            stripes: (0..stripes.max(1)).map(|_| RwLock::new(())).collect(),
        }
    }

    /// Creates a single lock shared by every key.
    pub fn coarse() -> Self {
        Self::new(1)
    }

    /// Returns the number of stripes.
    pub fn len(&self) -> usize {
        self.stripes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stripes.is_empty()
    }

    /// Returns the stripe index for `key`.
    pub fn stripe_of(&self, key: &str) -> usize {
        if self.stripes.len() == 1 {
            return 0;
        }
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.stripes.len() as u64) as usize
    }

    // == Write ==
    /// Waits for exclusive access to the stripe owning `key`.
    pub async fn write(&self, key: &str) -> RwLockWriteGuard<'_, ()> {
        self.stripes[self.stripe_of(key)].write().await
    }

    // == Write All ==
    /// Waits for exclusive access to every stripe, in index order.
    pub async fn write_all(&self) -> Vec<RwLockWriteGuard<'_, ()>> {
        let mut guards = Vec::with_capacity(self.stripes.len());
        for stripe in &self.stripes {
            guards.push(stripe.write().await);
        }
        guards
    }
}

impl Default for KeyLocks {
    fn default() -> Self {
        Self::coarse()
    }
}
