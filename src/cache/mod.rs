//! Cache Module
//!
//! Provides an in-process adaptive cache: bounded LRU storage with TTL
//! metadata, stale-while-revalidate reads with single-flight producers,
//! content-addressed keys, and explicit invalidation.

mod clock;
mod content_key;
mod coordinator;
mod entry;
mod freshness;
mod inflight;
mod invalidation;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use content_key::{content_hash, ContentKey, TrackedFields};
pub use coordinator::{Cache, GetOptions, WeakCache};
pub use entry::CacheEntry;
pub use freshness::{classify, Freshness};
pub use inflight::{Flight, FlightKind, InFlightRegistry, SharedFlight};
pub use invalidation::{glob_to_regex, owner_segment};
pub use lru::AccessOrder;
pub use stats::CacheStats;
pub use store::CacheStore;

// == Public Constants ==
/// Separator between the segments of a compound key
pub const KEY_SEPARATOR: char = ':';
