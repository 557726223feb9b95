//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and evictions.

use serde::Serialize;

// == Cache Stats ==
/// Snapshot of cache size and performance counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Current number of entries in the cache
    pub size: usize,
    /// Capacity bound
    pub max_size: usize,
    /// Reads answered with a fresh value
    pub hits: u64,
    /// Reads answered with a stale value while a refresh runs
    pub stale_hits: u64,
    /// Reads that found nothing usable
    pub misses: u64,
    /// Entries removed by LRU pressure
    pub evictions: u64,
    /// Successful background refreshes
    pub revalidations: u64,
    /// Failed background refreshes
    pub failed_revalidations: u64,
    /// Producer calls currently running
    pub in_flight: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            ..Self::default()
        }
    }

    // == Hit Rate ==
    /// Fraction of reads served from the cache, stale reads included.
    ///
    /// Returns 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits + self.stale_hits;
        let total = served + self.misses;
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_stale_hit(&mut self) {
        self.stale_hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_revalidation(&mut self) {
        self.revalidations += 1;
    }

    pub fn record_failed_revalidation(&mut self) {
        self.failed_revalidations += 1;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new(100);
        assert_eq!(stats.max_size, 100);
        assert_eq!(stats.size, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(CacheStats::new(10).hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_counts_stale_hits() {
        let mut stats = CacheStats::new(10);
        stats.record_hit();
        stats.record_stale_hit();
        stats.record_miss();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_revalidation_counters() {
        let mut stats = CacheStats::new(10);
        stats.record_revalidation();
        stats.record_failed_revalidation();
        stats.record_failed_revalidation();
        stats.record_eviction();
        assert_eq!(stats.revalidations, 1);
        assert_eq!(stats.failed_revalidations, 2);
        assert_eq!(stats.evictions, 1);
    }

    #[test]
    fn test_stats_serialize() {
        let stats = CacheStats::new(5);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["max_size"], 5);
        assert_eq!(json["size"], 0);
    }
}
