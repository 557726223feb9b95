//! Adaptive Cache - an in-process cache for expensive producers
//!
//! Sits between slow producers (database aggregations, LLM calls,
//! third-party APIs) and request handlers, with TTL freshness, LRU eviction,
//! stale-while-revalidate, single-flight producer calls and
//! content-addressed keys.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{Cache, CacheStats, ContentKey, GetOptions, TrackedFields};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use tasks::spawn_cleanup_task;
