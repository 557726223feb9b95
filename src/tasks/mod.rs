//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a cache is alive.
//!
//! # Tasks
//! - Expired entry cleanup: sweeps entries past their TTL and grace period

mod cleanup;

pub use cleanup::spawn_cleanup_task;
