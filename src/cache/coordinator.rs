//! Revalidation Coordinator
//!
//! Get-or-produce front end of the cache: decides between serving a cached
//! value, blocking on a producer, or serving stale data while a background
//! refresh runs. Every producer call goes through the in-flight registry, so
//! a key never has more than one producer running.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use futures::FutureExt;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{
    CacheStats, CacheStore, Clock, Flight, FlightKind, Freshness, InFlightRegistry,
    SharedFlight, SystemClock,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::spawn_cleanup_task;

// == Get Options ==
/// Per-call overrides for `Cache::get_or_fetch`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Freshness window for a value produced by this call
    pub ttl_ms: Option<u64>,
    /// Serve stale values while refreshing; falls back to the cache's configuration
    pub stale_while_revalidate: Option<bool>,
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.ttl_ms = Some(ttl_ms);
        self
    }

    pub fn stale_while_revalidate(mut self, enabled: bool) -> Self {
        self.stale_while_revalidate = Some(enabled);
        self
    }
}

/// Everything guarded by the cache lock.
#[derive(Debug)]
pub(crate) struct CacheState<T> {
    pub(crate) store: CacheStore<T>,
    pub(crate) in_flight: InFlightRegistry<T>,
}

pub(crate) struct Inner<T> {
    pub(crate) state: RwLock<CacheState<T>>,
    pub(crate) config: CacheConfig,
    cleanup: Mutex<Option<JoinHandle<()>>>,
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        let handle = self
            .cleanup
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

// == Cache ==
/// Shared handle to an adaptive cache.
///
/// Cloning is cheap and every clone refers to the same entries. Values are
/// handed out as clones; callers never hold references into the store.
pub struct Cache<T> {
    pub(crate) inner: Arc<Inner<T>>,
}

impl<T> Clone for Cache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Non-owning handle, used by background tasks that must not keep the cache alive.
pub struct WeakCache<T> {
    inner: Weak<Inner<T>>,
}

impl<T> Clone for WeakCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> WeakCache<T> {
    pub fn upgrade(&self) -> Option<Cache<T>> {
        self.inner.upgrade().map(|inner| Cache { inner })
    }
}

impl<T> Cache<T>
where
    T: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache backed by the wall clock.
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a cache reading time from `clock`.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let store = CacheStore::with_clock(config.max_size, config.default_ttl_ms, clock);
        Ok(Self {
            inner: Arc::new(Inner {
                state: RwLock::new(CacheState {
                    store,
                    in_flight: InFlightRegistry::new(),
                }),
                config,
                cleanup: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub fn downgrade(&self) -> WeakCache<T> {
        WeakCache {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // == Get ==
    /// Reads a value without a producer, using the configured
    /// stale-while-revalidate setting.
    pub async fn get(&self, key: &str) -> Option<T> {
        self.get_with(key, GetOptions::default()).await
    }

    /// Reads a value without a producer.
    ///
    /// Fresh entries are returned. Stale entries are returned only when
    /// stale-while-revalidate applies (per call, else configured); otherwise
    /// they count as a miss. `options.ttl_ms` is ignored since nothing is stored.
    pub async fn get_with(&self, key: &str, options: GetOptions) -> Option<T> {
        let stale_while_revalidate = options
            .stale_while_revalidate
            .unwrap_or(self.inner.config.stale_while_revalidate);
        let mut guard = self.inner.state.write().await;
        let state = &mut *guard;
        let now = state.store.now_ms();

        let lookup = state
            .store
            .get(key)
            .map(|entry| (entry.value.clone(), entry.freshness(now)));

        match lookup {
            Some((value, Freshness::Fresh)) => {
                state.store.stats_mut().record_hit();
                Some(value)
            }
            Some((value, Freshness::Stale)) if stale_while_revalidate => {
                state.store.stats_mut().record_stale_hit();
                Some(value)
            }
            _ => {
                state.store.stats_mut().record_miss();
                None
            }
        }
    }

    // == Get Or Fetch ==
    /// Returns the cached value for `key`, calling `producer` when needed.
    ///
    /// - Fresh: the cached value, producer untouched.
    /// - Stale with stale-while-revalidate: the stale value immediately; a
    ///   background refresh starts unless one is already running.
    /// - Missing, or stale without stale-while-revalidate: waits for the
    ///   producer and caches its value. Concurrent callers share one call.
    ///
    /// A stale entry whose background refreshes failed
    /// `max_background_failures` times in a row is refetched synchronously.
    ///
    /// # Errors
    /// Returns the producer's error on the synchronous paths. Nothing is
    /// cached on failure.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, options: GetOptions, producer: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let stale_while_revalidate = options
            .stale_while_revalidate
            .unwrap_or(self.inner.config.stale_while_revalidate);
        let max_failures = self.inner.config.max_background_failures;

        let pending = {
            let mut guard = self.inner.state.write().await;
            let state = &mut *guard;
            let now = state.store.now_ms();

            let lookup = state.store.get(key).map(|entry| {
                (
                    entry.value.clone(),
                    entry.freshness(now),
                    entry.ttl_ms,
                    entry.failed_revalidations,
                )
            });

            match lookup {
                Some((value, Freshness::Fresh, _, _)) => {
                    state.store.stats_mut().record_hit();
                    debug!(key = %key, "cache hit");
                    return Ok(value);
                }
                Some((value, Freshness::Stale, ttl_ms, failures))
                    if stale_while_revalidate && failures < max_failures =>
                {
                    state.store.stats_mut().record_stale_hit();
                    if state.in_flight.contains(key) {
                        debug!(key = %key, "stale hit, refresh already in flight");
                    } else {
                        let ttl_ms = options.ttl_ms.or(Some(ttl_ms));
                        // Nobody awaits a background refresh; the registry keeps its handle
                        let _background =
                            self.start_flight(state, key, FlightKind::Revalidate, ttl_ms, producer());
                        debug!(key = %key, "stale hit, background refresh started");
                    }
                    return Ok(value);
                }
                Some((_, Freshness::Stale, _, failures)) => {
                    state.store.stats_mut().record_miss();
                    if stale_while_revalidate {
                        warn!(
                            key = %key,
                            failures,
                            "background refresh keeps failing, refetching synchronously"
                        );
                    }
                }
                None => {
                    state.store.stats_mut().record_miss();
                }
            }

            match state.in_flight.get(key) {
                Some(flight) => {
                    debug!(key = %key, generation = flight.generation, "joining in-flight producer");
                    flight.result.clone()
                }
                None => {
                    debug!(key = %key, "cache miss, calling producer");
                    self.start_flight(state, key, FlightKind::Load, options.ttl_ms, producer())
                }
            }
        };

        pending.await
    }

    /// Spawns `work` as the single flight for `key` and registers it.
    ///
    /// Must be called with the lock held and no flight registered for `key`.
    fn start_flight<Fut>(
        &self,
        state: &mut CacheState<T>,
        key: &str,
        kind: FlightKind,
        ttl_ms: Option<u64>,
        work: Fut,
    ) -> SharedFlight<T>
    where
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let generation = state.in_flight.next_generation();
        let inner = Arc::clone(&self.inner);
        let flight_key = key.to_string();
        let handle = tokio::spawn(async move {
            run_flight(inner, flight_key, generation, kind, ttl_ms, work).await
        });

        let aborted_key = key.to_string();
        let result = async move {
            handle
                .await
                .unwrap_or_else(|_| Err(CacheError::FlightAborted { key: aborted_key }))
        }
        .boxed()
        .shared();

        state.in_flight.register(
            key,
            Flight {
                generation,
                kind,
                result: result.clone(),
            },
        );
        result
    }

    // == Set ==
    /// Stores a value directly. A zero or absent TTL uses the default.
    ///
    /// A flight already running for the key is superseded: its callers still
    /// get its result, but it no longer overwrites this value.
    pub async fn set(&self, key: impl Into<String>, value: T, ttl_ms: Option<u64>) {
        let key = key.into();
        let mut state = self.inner.state.write().await;
        if let Some(flight) = state.in_flight.remove(&key) {
            debug!(key = %key, generation = flight.generation, "explicit set supersedes flight");
        }
        state.store.set(key, value, ttl_ms);
    }

    // == Has ==
    /// True only if `key` is present and fresh. Counts as an access.
    pub async fn has(&self, key: &str) -> bool {
        let mut state = self.inner.state.write().await;
        let now = state.store.now_ms();
        state
            .store
            .get(key)
            .map(|entry| entry.is_fresh(now))
            .unwrap_or(false)
    }

    // == Stats ==
    pub async fn stats(&self) -> CacheStats {
        let state = self.inner.state.read().await;
        let mut stats = state.store.stats();
        stats.in_flight = state.in_flight.len();
        stats
    }

    pub async fn len(&self) -> usize {
        self.inner.state.read().await.store.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.state.read().await.store.is_empty()
    }

    // == Cleanup ==
    /// Runs one sweep, removing entries that outlived their TTL plus the
    /// configured grace period. Keys with a flight in progress are kept.
    pub async fn purge_expired(&self) -> usize {
        let mut guard = self.inner.state.write().await;
        let state = &mut *guard;
        let in_flight = &state.in_flight;
        state
            .store
            .cleanup_expired(self.inner.config.stale_grace_ms, |key| in_flight.contains(key))
    }

    /// Starts the periodic sweep, replacing any sweep already running.
    pub fn start_cleanup(&self) {
        let handle = spawn_cleanup_task(self.downgrade(), self.inner.config.cleanup_interval());
        let previous = self
            .inner
            .cleanup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Stops the periodic sweep. Returns false if none was running.
    pub fn stop_cleanup(&self) -> bool {
        let handle = self
            .inner
            .cleanup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match handle {
            Some(handle) => {
                handle.abort();
                info!("cache cleanup task stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_cleanup_running(&self) -> bool {
        self.inner
            .cleanup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

/// Runs a producer to completion and applies its outcome.
///
/// The write happens only if this flight's marker is still registered; an
/// invalidation in the meantime discards the value for the cache but the
/// waiting callers still receive it.
async fn run_flight<T, Fut>(
    inner: Arc<Inner<T>>,
    key: String,
    generation: u64,
    kind: FlightKind,
    ttl_ms: Option<u64>,
    work: Fut,
) -> Result<T>
where
    T: Clone + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
{
    let result = match AssertUnwindSafe(work).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(CacheError::producer(key.as_str(), err)),
        Err(_) => Err(CacheError::ProducerPanicked { key: key.clone() }),
    };

    let mut guard = inner.state.write().await;
    let state = &mut *guard;
    if !state.in_flight.complete(&key, generation) {
        debug!(key = %key, generation, "flight superseded by invalidation, result not cached");
        return result;
    }

    match (&result, kind) {
        (Ok(value), FlightKind::Load) => {
            state.store.refresh(&key, value.clone(), ttl_ms);
        }
        (Ok(value), FlightKind::Revalidate) => {
            // An entry evicted while its refresh ran stays evicted
            if state.store.replace_existing(&key, value.clone(), ttl_ms) {
                state.store.stats_mut().record_revalidation();
                debug!(key = %key, generation, "background refresh stored");
            } else {
                debug!(key = %key, generation, "entry evicted during refresh, result dropped");
            }
        }
        (Err(err), FlightKind::Load) => {
            debug!(key = %key, error = %err, "producer failed, nothing cached");
        }
        (Err(err), FlightKind::Revalidate) => {
            let failures = state.store.record_failed_revalidation(&key);
            warn!(
                key = %key,
                error = %err,
                failures = failures.unwrap_or(0),
                "background refresh failed, keeping stale value"
            );
        }
    }
    result
}
