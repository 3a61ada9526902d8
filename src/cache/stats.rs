//! Cache Statistics Module
//!
//! Tracks provider metrics including hits, misses, supplier calls and
//! swallowed write failures.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Provider Stats ==
/// Lock-free counters updated by concurrent provider calls.
#[derive(Debug, Default)]
pub struct ProviderStats {
    hits: AtomicU64,
    misses: AtomicU64,
    supplier_calls: AtomicU64,
    write_failures: AtomicU64,
    removed_keys: AtomicU64,
}

impl ProviderStats {
    // == Constructor ==
    /// Creates a new ProviderStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_supplier_call(&self) {
        self.supplier_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a write or delete failure that was logged instead of returned.
    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_removed(&self, count: u64) {
        self.removed_keys.fetch_add(count, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Returns a point-in-time copy of the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            supplier_calls: self.supplier_calls.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            removed_keys: self.removed_keys.load(Ordering::Relaxed),
        }
    }
}

// == Stats Snapshot ==
/// Copy of the provider counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Lookups that found a value
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Times a supplier was invoked
    pub supplier_calls: u64,
    /// Writes and deletes that failed and were swallowed
    pub write_failures: u64,
    /// Keys deleted through remove and pattern remove
    pub removed_keys: u64,
}

impl StatsSnapshot {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = ProviderStats::new().snapshot();
        assert_eq!(stats, StatsSnapshot::default());
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = ProviderStats::new();
        assert_eq!(stats.snapshot().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let stats = ProviderStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.snapshot().hit_rate(), 0.75);
    }

    #[test]
    fn test_counters() {
        let stats = ProviderStats::new();
        stats.record_supplier_call();
        stats.record_write_failure();
        stats.record_write_failure();
        stats.record_removed(3);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.supplier_calls, 1);
        assert_eq!(snapshot.write_failures, 2);
        assert_eq!(snapshot.removed_keys, 3);
    }
}
