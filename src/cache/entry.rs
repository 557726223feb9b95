//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL metadata.

use crate::cache::freshness::{classify, Freshness};

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The stored value
    pub value: T,
    /// Store timestamp (Unix milliseconds)
    pub stored_at: u64,
    /// Freshness window in milliseconds, always greater than zero
    pub ttl_ms: u64,
    /// Consecutive failed background refreshes since the value was last stored
    pub failed_revalidations: u32,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a new cache entry stored at `stored_at`.
    ///
    /// A zero TTL is raised to one millisecond.
    pub fn new(value: T, stored_at: u64, ttl_ms: u64) -> Self {
        Self {
            value,
            stored_at,
            ttl_ms: ttl_ms.max(1),
            failed_revalidations: 0,
        }
    }

    // == Age ==
    /// Milliseconds elapsed since the value was stored.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.stored_at)
    }

    pub fn freshness(&self, now_ms: u64) -> Freshness {
        classify(self, now_ms)
    }

    pub fn is_fresh(&self, now_ms: u64) -> bool {
        self.freshness(now_ms) == Freshness::Fresh
    }

    // == Time To Live ==
    /// Returns remaining freshness in milliseconds, `0` once stale.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.ttl_ms.saturating_sub(self.age_ms(now_ms))
    }

    /// Replaces the value in place and restarts its freshness window.
    pub(crate) fn replace(&mut self, value: T, stored_at: u64, ttl_ms: u64) {
        self.value = value;
        self.stored_at = stored_at;
        self.ttl_ms = ttl_ms.max(1);
        self.failed_revalidations = 0;
    }
}
