//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// Cloneable so a single flight outcome can be handed to every caller
/// waiting on the same key.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// The producer supplied for a key returned an error
    #[error("Producer failed for key {key}: {source}")]
    Producer {
        key: String,
        #[source]
        source: Arc<dyn StdError + Send + Sync>,
    },

    /// The producer panicked while computing a value
    #[error("Producer panicked for key {key}")]
    ProducerPanicked { key: String },

    /// The task running a flight was cancelled before completing
    #[error("Flight aborted for key {key}")]
    FlightAborted { key: String },

    /// An invalidation glob could not be compiled
    #[error("Invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Tracked fields could not be serialized into a content key
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration values are out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CacheError {
    /// Wraps a producer failure for `key`.
    pub fn producer(key: impl Into<String>, err: anyhow::Error) -> Self {
        let source: Box<dyn StdError + Send + Sync> = err.into();
        CacheError::Producer {
            key: key.into(),
            source: Arc::from(source),
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_producer_error_keeps_message() {
        let err = CacheError::producer("leads:42", anyhow::anyhow!("db timeout"));

        assert!(matches!(&err, CacheError::Producer { key, .. } if key == "leads:42"));
        assert_eq!(err.to_string(), "Producer failed for key leads:42: db timeout");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_clone_shares_source() {
        let err = CacheError::producer("k", anyhow::anyhow!("boom"));
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }
}
