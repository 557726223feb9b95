//! Invalidation Router
//!
//! Explicit removal by exact key, owner segment, or glob pattern. Removing a
//! key also drops its in-flight marker, so a producer still running for it
//! can no longer write its result back.

use regex::Regex;
use tracing::debug;

use crate::cache::{Cache, KEY_SEPARATOR};
use crate::error::{CacheError, Result};

/// Compiles a glob into an anchored regex. `*` matches any run of
/// characters; everything else is literal.
pub fn glob_to_regex(glob: &str) -> Result<Regex> {
    let body = glob
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{body}$")).map_err(|source| CacheError::InvalidPattern {
        pattern: glob.to_string(),
        source,
    })
}

/// Owner segment of a `namespace:owner:mode:hash` key.
pub fn owner_segment(key: &str) -> Option<&str> {
    key.split(KEY_SEPARATOR).nth(1)
}

impl<T> Cache<T>
where
    T: Clone + Send + Sync + 'static,
{
    // == Invalidate ==
    /// Removes one entry and any flight running for it.
    ///
    /// Returns whether an entry was removed.
    pub async fn invalidate(&self, key: &str) -> bool {
        let mut state = self.inner.state.write().await;
        let removed = state.store.delete(key).is_some();
        let cancelled = state.in_flight.remove(key).is_some();
        debug!(key = %key, removed, cancelled, "invalidated key");
        removed
    }

    // == Invalidate By Owner ==
    /// Removes every key whose owner segment equals `owner_id`.
    pub async fn invalidate_by_owner(&self, owner_id: &str) -> usize {
        let matches = |key: &str| owner_segment(key) == Some(owner_id);
        let removed = self.remove_matching(matches).await;
        debug!(owner = %owner_id, removed, "invalidated owner");
        removed
    }

    // == Invalidate Pattern ==
    /// Removes every key matching `glob`.
    ///
    /// # Errors
    /// Returns `CacheError::InvalidPattern` if the glob cannot be compiled.
    pub async fn invalidate_pattern(&self, glob: &str) -> Result<usize> {
        let pattern = glob_to_regex(glob)?;
        let removed = self.remove_matching(|key| pattern.is_match(key)).await;
        debug!(pattern = %glob, removed, "invalidated pattern");
        Ok(removed)
    }

    // == Clear ==
    /// Drops all entries, access records and in-flight markers.
    pub async fn clear(&self) {
        let mut state = self.inner.state.write().await;
        state.store.clear();
        state.in_flight.clear();
        debug!("cache cleared");
    }

    async fn remove_matching(&self, matches: impl Fn(&str) -> bool) -> usize {
        let mut state = self.inner.state.write().await;
        state.in_flight.remove_where(&matches);
        state.store.remove_where(&matches).len()
    }
}
