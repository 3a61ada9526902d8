//! Back Reference Module
//!
//! Weak edge that breaks reference cycles in shared object graphs.

use std::fmt;
use std::sync::{Arc, Weak};

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// == Back Ref ==
/// Non-owning reference to an `Arc`-shared parent.
///
/// Serializes as `null` and deserializes detached, so a child pointing back
/// at its owner never makes the encoder walk the cycle.
pub struct BackRef<T>(Weak<T>);

impl<T> BackRef<T> {
    /// Creates a reference to `target`.
    pub fn to(target: &Arc<T>) -> Self {
        Self(Arc::downgrade(target))
    }

    /// Creates a reference pointing nowhere.
    pub fn detached() -> Self {
        Self(Weak::new())
    }

    /// Returns the target if it is still alive.
    pub fn upgrade(&self) -> Option<Arc<T>> {
        self.0.upgrade()
    }

    pub fn is_attached(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl<T> Default for BackRef<T> {
    fn default() -> Self {
        Self::detached()
    }
}

impl<T> Clone for BackRef<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> fmt::Debug for BackRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_attached() { "attached" } else { "detached" };
        f.debug_tuple("BackRef").field(&state).finish()
    }
}

impl<T> Serialize for BackRef<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_unit()
    }
}

impl<'de, T> Deserialize<'de> for BackRef<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IgnoredAny::deserialize(deserializer)?;
        Ok(Self::detached())
    }
}
