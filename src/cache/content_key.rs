//! Content Key Deriver
//!
//! Turns a mutable collection into a stable hash so cached artifacts built
//! from it are keyed by content. Only the fields an artifact depends on are
//! hashed, and item order does not matter.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::cache::KEY_SEPARATOR;
use crate::error::{CacheError, Result};

/// Number of digest bytes kept in a content hash.
const HASH_BYTES: usize = 16;

/// Fields of an item that affect a cached artifact.
///
/// `project` should return only the tracked fields (status, priority,
/// ordering, timestamps...) and serialize deterministically, so prefer
/// structs and ordered collections over hash maps.
pub trait TrackedFields {
    type Projection: Serialize;

    /// Stable identity used to order items before hashing.
    fn identity(&self) -> String;

    fn project(&self) -> Self::Projection;
}

// == Derive ==
/// Hashes the tracked fields of `items`, independent of their order.
///
/// Returns a lowercase hex digest.
pub fn content_hash<I: TrackedFields>(items: &[I]) -> Result<String> {
    let mut projected = items
        .iter()
        .map(|item| {
            serde_json::to_string(&item.project())
                .map(|fields| (item.identity(), fields))
                .map_err(|e| CacheError::Serialization(e.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;
    projected.sort();

    let mut hasher = Sha256::new();
    for (identity, fields) in &projected {
        hasher.update(identity.as_bytes());
        hasher.update([0u8]);
        hasher.update(fields.as_bytes());
        hasher.update([b'\n']);
    }
    Ok(hex::encode(&hasher.finalize()[..HASH_BYTES]))
}

// == Content Key ==
/// Compound cache key `namespace:owner:mode:hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentKey {
    pub namespace: String,
    pub owner_id: String,
    pub mode: String,
    pub hash: String,
}

impl ContentKey {
    /// Builds the key for an artifact derived from `items`.
    pub fn for_items<I: TrackedFields>(
        namespace: impl Into<String>,
        owner_id: impl Into<String>,
        mode: impl Into<String>,
        items: &[I],
    ) -> Result<Self> {
        Ok(Self {
            namespace: namespace.into(),
            owner_id: owner_id.into(),
            mode: mode.into(),
            hash: content_hash(items)?,
        })
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}{sep}{}",
            self.namespace,
            self.owner_id,
            self.mode,
            self.hash,
            sep = KEY_SEPARATOR
        )
    }
}

impl From<ContentKey> for String {
    fn from(key: ContentKey) -> Self {
        key.to_string()
    }
}
