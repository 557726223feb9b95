//! Freshness Policy
//!
//! Pure classification of a cache entry against the current time.

use crate::cache::CacheEntry;

/// Whether an entry is still inside its TTL window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
}

/// Classifies `entry` at time `now_ms`.
///
/// An entry is fresh while `now - stored_at < ttl`. A clock reading earlier
/// than `stored_at` counts as age zero.
pub fn classify<T>(entry: &CacheEntry<T>, now_ms: u64) -> Freshness {
    if entry.age_ms(now_ms) < entry.ttl_ms {
        Freshness::Fresh
    } else {
        Freshness::Stale
    }
}
