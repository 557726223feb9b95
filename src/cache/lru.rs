//! Access Order Module
//!
//! Tracks last-access times for LRU eviction.

use std::collections::HashMap;

// == Access Record ==
/// Ranking data for one key. Ordered by wall time, then by access sequence,
/// so accesses within the same millisecond still rank in the order they happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct AccessRecord {
    at_ms: u64,
    seq: u64,
}

// == Access Order ==
/// Maps each cached key to its last access.
///
/// Eviction picks the key with the oldest record; remaining ties fall back
/// to key ordering so the choice is always deterministic.
#[derive(Debug, Default)]
pub struct AccessOrder {
    records: HashMap<String, AccessRecord>,
    seq: u64,
}

impl AccessOrder {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as accessed at `now_ms`, inserting it if new.
    pub fn touch(&mut self, key: &str, now_ms: u64) {
        self.seq += 1;
        let record = AccessRecord {
            at_ms: now_ms,
            seq: self.seq,
        };
        match self.records.get_mut(key) {
            Some(existing) => *existing = record,
            None => {
                self.records.insert(key.to_string(), record);
            }
        }
    }

    // == Remove ==
    /// Removes a key from the tracker. Returns whether it was tracked.
    pub fn remove(&mut self, key: &str) -> bool {
        self.records.remove(key).is_some()
    }

    // == Least Recent ==
    /// Returns the least recently used key without removing it.
    ///
    /// Full scan over all tracked keys.
    pub fn least_recent(&self) -> Option<&str> {
        self.records
            .iter()
            .min_by(|(key_a, a), (key_b, b)| a.cmp(b).then_with(|| key_a.cmp(key_b)))
            .map(|(key, _)| key.as_str())
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let key = self.least_recent()?.to_string();
        self.records.remove(&key);
        Some(key)
    }

    /// Last access time of `key` in Unix milliseconds.
    pub fn last_access_ms(&self, key: &str) -> Option<u64> {
        self.records.get(key).map(|r| r.at_ms)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
