//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    pub max_size: usize,
    /// Default freshness window in milliseconds for entries without explicit TTL
    pub default_ttl_ms: u64,
    /// Background cleanup task interval in milliseconds
    pub cleanup_interval_ms: u64,
    /// How long an entry is kept past its TTL before the sweep removes it
    pub stale_grace_ms: u64,
    /// Whether reads serve stale values while refreshing in the background
    pub stale_while_revalidate: bool,
    /// Consecutive failed background refreshes before reads fall back to a synchronous refetch
    pub max_background_failures: u32,
}

impl CacheConfig {
    /// Short-lived general purpose preset (5 minute TTL, 200 entries).
    pub fn general() -> Self {
        Self {
            max_size: 200,
            default_ttl_ms: 5 * 60 * 1000,
            cleanup_interval_ms: 60 * 1000,
            stale_grace_ms: 5 * 60 * 1000,
            stale_while_revalidate: true,
            max_background_failures: 3,
        }
    }

    /// Preset for expensive AI-derived artifacts (30 minute TTL, 100 entries).
    pub fn ai_artifacts() -> Self {
        Self {
            max_size: 100,
            default_ttl_ms: 30 * 60 * 1000,
            stale_grace_ms: 30 * 60 * 1000,
            ..Self::general()
        }
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_SIZE` - Maximum cache entries (default: 200)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `CACHE_CLEANUP_INTERVAL_MS` - Sweep frequency in milliseconds (default: 60000)
    /// - `CACHE_STALE_GRACE_MS` - Retention past TTL in milliseconds (default: 300000)
    /// - `CACHE_STALE_WHILE_REVALIDATE` - Serve stale while refreshing (default: true)
    /// - `CACHE_MAX_BACKGROUND_FAILURES` - Failures before forcing a refetch (default: 3)
    pub fn from_env() -> Self {
        let defaults = Self::general();
        Self {
            max_size: env_or("CACHE_MAX_SIZE", defaults.max_size),
            default_ttl_ms: env_or("CACHE_DEFAULT_TTL_MS", defaults.default_ttl_ms),
            cleanup_interval_ms: env_or("CACHE_CLEANUP_INTERVAL_MS", defaults.cleanup_interval_ms),
            stale_grace_ms: env_or("CACHE_STALE_GRACE_MS", defaults.stale_grace_ms),
            stale_while_revalidate: env_or(
                "CACHE_STALE_WHILE_REVALIDATE",
                defaults.stale_while_revalidate,
            ),
            max_background_failures: env_or(
                "CACHE_MAX_BACKGROUND_FAILURES",
                defaults.max_background_failures,
            ),
        }
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(CacheError::InvalidConfig(
                "max_size must be greater than zero".to_string(),
            ));
        }
        if self.default_ttl_ms == 0 {
            return Err(CacheError::InvalidConfig(
                "default_ttl_ms must be greater than zero".to_string(),
            ));
        }
        if self.cleanup_interval_ms == 0 {
            return Err(CacheError::InvalidConfig(
                "cleanup_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_background_failures == 0 {
            return Err(CacheError::InvalidConfig(
                "max_background_failures must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_default_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.default_ttl_ms = ttl_ms;
        self
    }

    pub fn with_cleanup_interval_ms(mut self, interval_ms: u64) -> Self {
        self.cleanup_interval_ms = interval_ms;
        self
    }

    pub fn with_stale_grace_ms(mut self, grace_ms: u64) -> Self {
        self.stale_grace_ms = grace_ms;
        self
    }

    pub fn with_stale_while_revalidate(mut self, enabled: bool) -> Self {
        self.stale_while_revalidate = enabled;
        self
    }

    pub fn with_max_background_failures(mut self, failures: u32) -> Self {
        self.max_background_failures = failures;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::general()
    }
}

fn env_or<V: FromStr>(name: &str, default: V) -> V {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.max_size, 200);
        assert_eq!(config.default_ttl_ms, 300_000);
        assert_eq!(config.cleanup_interval_ms, 60_000);
        assert!(config.stale_while_revalidate);
        assert_eq!(config.max_background_failures, 3);
    }

    #[test]
    fn test_ai_artifacts_preset() {
        let config = CacheConfig::ai_artifacts();
        assert_eq!(config.max_size, 100);
        assert_eq!(config.default_ttl_ms, 1_800_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env_defaults() {
        env::remove_var("CACHE_MAX_SIZE");
        env::remove_var("CACHE_DEFAULT_TTL_MS");
        env::remove_var("CACHE_CLEANUP_INTERVAL_MS");
        env::remove_var("CACHE_STALE_GRACE_MS");
        env::remove_var("CACHE_STALE_WHILE_REVALIDATE");
        env::remove_var("CACHE_MAX_BACKGROUND_FAILURES");

        let config = CacheConfig::from_env();
        assert_eq!(config, CacheConfig::general());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert!(CacheConfig::general().with_max_size(0).validate().is_err());
        assert!(CacheConfig::general().with_default_ttl_ms(0).validate().is_err());
        assert!(CacheConfig::general()
            .with_cleanup_interval_ms(0)
            .validate()
            .is_err());
        assert!(matches!(
            CacheConfig::general().with_max_background_failures(0).validate(),
            Err(CacheError::InvalidConfig(_))
        ));
    }
}
