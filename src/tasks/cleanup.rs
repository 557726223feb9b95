//! TTL Cleanup Task
//!
//! Background task that periodically removes long-expired cache entries.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::WeakCache;

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// The task holds only a weak handle: it exits on its own once every
/// `Cache` handle has been dropped. Abort the returned handle to stop it
/// earlier; `Cache::start_cleanup`/`Cache::stop_cleanup` do this for you.
///
/// # Example
/// ```ignore
/// let cache: Cache<String> = Cache::new(CacheConfig::general())?;
/// let handle = spawn_cleanup_task(cache.downgrade(), Duration::from_secs(60));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_cleanup_task<T>(cache: WeakCache<T>, interval: Duration) -> JoinHandle<()>
where
    T: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(
            interval_ms = interval.as_millis() as u64,
            "starting cache cleanup task"
        );

        loop {
            tokio::time::sleep(interval).await;

            let Some(strong) = cache.upgrade() else {
                debug!("cache dropped, cleanup task exiting");
                break;
            };
            let removed = strong.purge_expired().await;
            drop(strong);

            if removed > 0 {
                info!(removed, "cache cleanup removed expired entries");
            } else {
                debug!("cache cleanup found no expired entries");
            }
        }
    })
}
