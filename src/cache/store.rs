//! Cache Store Module
//!
//! Bounded key-value storage combining a HashMap with LRU access tracking and TTL metadata.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{AccessOrder, CacheEntry, CacheStats, Clock, SystemClock};

// == Cache Store ==
/// Bounded cache storage with LRU eviction.
///
/// The store never judges freshness on reads; it only records access and
/// keeps `len() <= max_size` after every mutation. Every stored key has
/// exactly one access record and vice versa.
#[derive(Debug)]
pub struct CacheStore<T> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<T>>,
    /// LRU access tracker
    access: AccessOrder,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_size: usize,
    /// TTL in milliseconds for entries without explicit TTL
    default_ttl_ms: u64,
    clock: Arc<dyn Clock>,
}

impl<T> CacheStore<T> {
    // == Constructor ==
    /// Creates a new CacheStore backed by the wall clock.
    ///
    /// # Arguments
    /// * `max_size` - Maximum number of entries, raised to 1 if zero
    /// * `default_ttl_ms` - TTL for entries stored without one, raised to 1 if zero
    pub fn new(max_size: usize, default_ttl_ms: u64) -> Self {
        Self::with_clock(max_size, default_ttl_ms, Arc::new(SystemClock))
    }

    /// Creates a new CacheStore reading time from `clock`.
    pub fn with_clock(max_size: usize, default_ttl_ms: u64, clock: Arc<dyn Clock>) -> Self {
        let max_size = max_size.max(1);
        Self {
            entries: HashMap::new(),
            access: AccessOrder::new(),
            stats: CacheStats::new(max_size),
            max_size,
            default_ttl_ms: default_ttl_ms.max(1),
            clock,
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Resolves an optional per-call TTL, treating zero as absent.
    pub fn resolve_ttl(&self, ttl_ms: Option<u64>) -> u64 {
        ttl_ms.filter(|ttl| *ttl > 0).unwrap_or(self.default_ttl_ms)
    }

    // == Get ==
    /// Looks up an entry and marks it as recently used.
    pub fn get(&mut self, key: &str) -> Option<&CacheEntry<T>> {
        if !self.entries.contains_key(key) {
            return None;
        }
        let now = self.clock.now_ms();
        self.access.touch(key, now);
        self.entries.get(key)
    }

    /// Looks up an entry without affecting LRU order.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry<T>> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Set ==
    /// Stores a value, replacing any existing entry for the key.
    ///
    /// A new key evicts least recently used entries first when the store is full.
    /// Returns the keys evicted to make room.
    pub fn set(&mut self, key: String, value: T, ttl_ms: Option<u64>) -> Vec<String> {
        let now = self.clock.now_ms();
        let ttl_ms = self.resolve_ttl(ttl_ms);

        let mut evicted = Vec::new();
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.replace(value, now, ttl_ms);
        } else {
            evicted = self.evict_until(self.max_size - 1);
            self.entries
                .insert(key.clone(), CacheEntry::new(value, now, ttl_ms));
        }
        self.access.touch(&key, now);
        evicted
    }

    // == Refresh ==
    /// Writes a recomputed value for `key`.
    ///
    /// An existing entry is replaced in place and keeps its LRU rank; a key
    /// that disappeared in the meantime is inserted like `set`.
    pub fn refresh(&mut self, key: &str, value: T, ttl_ms: Option<u64>) -> Vec<String> {
        let now = self.clock.now_ms();
        let ttl_ms = self.resolve_ttl(ttl_ms);
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.replace(value, now, ttl_ms);
                Vec::new()
            }
            None => self.set(key.to_string(), value, Some(ttl_ms)),
        }
    }

    /// Replaces the value of an existing entry in place, keeping its LRU rank.
    ///
    /// Returns false and stores nothing if the key is no longer present.
    pub fn replace_existing(&mut self, key: &str, value: T, ttl_ms: Option<u64>) -> bool {
        let now = self.clock.now_ms();
        let ttl_ms = self.resolve_ttl(ttl_ms);
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.replace(value, now, ttl_ms);
                true
            }
            None => false,
        }
    }

    /// Counts a failed background refresh against `key`.
    ///
    /// Returns the number of consecutive failures, or None if the key is gone.
    pub fn record_failed_revalidation(&mut self, key: &str) -> Option<u32> {
        self.stats.record_failed_revalidation();
        self.entries.get_mut(key).map(|entry| {
            entry.failed_revalidations += 1;
            entry.failed_revalidations
        })
    }

    // == Delete ==
    /// Removes an entry by key, returning it if present.
    pub fn delete(&mut self, key: &str) -> Option<CacheEntry<T>> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.access.remove(key);
        }
        removed
    }

    /// Removes every entry whose key matches `predicate`.
    pub fn remove_where(&mut self, predicate: impl Fn(&str) -> bool) -> Vec<String> {
        let keys: Vec<String> = self
            .entries
            .keys()
            .filter(|key| predicate(key))
            .cloned()
            .collect();
        for key in &keys {
            self.entries.remove(key);
            self.access.remove(key);
        }
        keys
    }

    // == Eviction ==
    /// Evicts least recently used entries until the store is within `max_size`.
    pub fn evict_if_needed(&mut self) -> Vec<String> {
        self.evict_until(self.max_size)
    }

    fn evict_until(&mut self, limit: usize) -> Vec<String> {
        let mut evicted = Vec::new();
        while self.entries.len() > limit {
            let Some(key) = self.access.evict_oldest() else {
                break;
            };
            self.entries.remove(&key);
            self.stats.record_eviction();
            debug!(key = %key, "evicted least recently used entry");
            evicted.push(key);
        }
        evicted
    }

    // == Cleanup Expired ==
    /// Removes entries that have been stale for at least `grace_ms`,
    /// skipping keys for which `keep` returns true.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self, grace_ms: u64, keep: impl Fn(&str) -> bool) -> usize {
        let now = self.clock.now_ms();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, entry)| {
                entry.age_ms(now) >= entry.ttl_ms.saturating_add(grace_ms) && !keep(key)
            })
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.remove(key);
            self.access.remove(key);
        }
        expired.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub(crate) fn stats_mut(&mut self) -> &mut CacheStats {
        &mut self.stats
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.size = self.entries.len();
        stats
    }

    /// Drops every entry and access record.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.access.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Number of access records; equals `len()` at all times.
    pub fn tracked_len(&self) -> usize {
        self.access.len()
    }
}
