//! Integration Tests for the cache front end
//!
//! Exercises the public API against the wall clock and real timers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use adaptive_cache::{Cache, CacheConfig, CacheError, ContentKey, GetOptions, TrackedFields};
use serde::Serialize;
use tokio::time::sleep;
use tokio_test::{assert_err, assert_ok};

// == Helper Functions ==

fn create_test_cache(max_size: usize) -> Cache<String> {
    Cache::new(CacheConfig::general().with_max_size(max_size)).unwrap()
}

// == LRU ==

#[tokio::test]
async fn test_lru_evicts_oldest() {
    let cache = create_test_cache(2);

    cache.set("a", "1".to_string(), None).await;
    cache.set("b", "2".to_string(), None).await;
    cache.set("c", "3".to_string(), None).await;

    assert_eq!(cache.get("a").await, None);
    assert_eq!(cache.get("b").await, Some("2".to_string()));
    assert_eq!(cache.get("c").await, Some("3".to_string()));
}

#[tokio::test]
async fn test_lru_reranks_on_get() {
    let cache = create_test_cache(2);

    cache.set("a", "1".to_string(), None).await;
    cache.set("b", "2".to_string(), None).await;
    cache.get("a").await;
    cache.set("c", "3".to_string(), None).await;

    assert_eq!(cache.get("b").await, None);
    assert_eq!(cache.get("a").await, Some("1".to_string()));
    assert_eq!(cache.get("c").await, Some("3".to_string()));
}

// == Freshness ==

#[tokio::test]
async fn test_ttl_expiry_synchronous_refetch() {
    let cache = create_test_cache(10);

    cache.set("k", "v1".to_string(), Some(50)).await;
    sleep(Duration::from_millis(80)).await;

    let value = cache
        .get_or_fetch("k", GetOptions::new().stale_while_revalidate(false), || async {
            Ok("v2".to_string())
        })
        .await;

    assert_eq!(assert_ok!(value), "v2");
    assert_eq!(cache.get("k").await, Some("v2".to_string()));
}

#[tokio::test]
async fn test_stale_while_revalidate() {
    let cache = create_test_cache(10);

    cache.set("k", "v1".to_string(), Some(10)).await;
    sleep(Duration::from_millis(20)).await;

    let value = cache
        .get_or_fetch(
            "k",
            GetOptions::new().stale_while_revalidate(true).ttl_ms(60_000),
            || async {
                sleep(Duration::from_millis(50)).await;
                Ok("v2".to_string())
            },
        )
        .await;
    assert_eq!(assert_ok!(value), "v1");

    sleep(Duration::from_millis(150)).await;
    assert_eq!(cache.get("k").await, Some("v2".to_string()));
    assert!(cache.has("k").await);
}

#[tokio::test]
async fn test_background_single_flight() {
    let cache = create_test_cache(10);
    let calls = Arc::new(AtomicUsize::new(0));

    cache.set("k", "v1".to_string(), Some(10)).await;
    sleep(Duration::from_millis(20)).await;

    let producer = |calls: Arc<AtomicUsize>| {
        move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            sleep(Duration::from_millis(50)).await;
            Ok::<_, anyhow::Error>("v2".to_string())
        }
    };
    let options = GetOptions::new().stale_while_revalidate(true).ttl_ms(60_000);

    let (a, b) = tokio::join!(
        cache.get_or_fetch("k", options, producer(calls.clone())),
        cache.get_or_fetch("k", options, producer(calls.clone())),
    );
    assert_eq!(a.unwrap(), "v1");
    assert_eq!(b.unwrap(), "v1");

    sleep(Duration::from_millis(150)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// == Invalidation ==

#[tokio::test]
async fn test_pattern_invalidation() {
    let cache = create_test_cache(10);

    cache.set("leads/1", "a".to_string(), None).await;
    cache.set("leads/2", "b".to_string(), None).await;
    cache.set("campaigns/1", "c".to_string(), None).await;

    assert_ok!(cache.invalidate_pattern("leads/*").await);

    assert_eq!(cache.get("leads/1").await, None);
    assert_eq!(cache.get("leads/2").await, None);
    assert_eq!(cache.get("campaigns/1").await, Some("c".to_string()));
}

#[tokio::test]
async fn test_end_to_end() {
    let cache = create_test_cache(10);

    let value = cache
        .get_or_fetch("x", GetOptions::new().ttl_ms(60_000), || async {
            Ok("hello".to_string())
        })
        .await;
    assert_eq!(assert_ok!(value), "hello");
    assert!(cache.has("x").await);

    cache.invalidate("x").await;
    assert!(!cache.has("x").await);
}

#[tokio::test]
async fn test_producer_failure_surfaces_to_caller() {
    let cache = create_test_cache(10);

    let result = cache
        .get_or_fetch("x", GetOptions::new(), || async {
            Err::<String, _>(anyhow::anyhow!("llm quota exceeded"))
        })
        .await;

    let err = assert_err!(result);
    assert!(matches!(err, CacheError::Producer { .. }));
    assert!(err.to_string().contains("llm quota exceeded"));
    assert_eq!(cache.get("x").await, None);
}

// == Content keys ==

#[derive(Debug, Clone)]
struct Lead {
    id: u64,
    stage: &'static str,
    score: u32,
    notes: String,
}

#[derive(Serialize)]
struct LeadFields {
    stage: &'static str,
    score: u32,
}

impl TrackedFields for Lead {
    type Projection = LeadFields;

    fn identity(&self) -> String {
        self.id.to_string()
    }

    fn project(&self) -> Self::Projection {
        LeadFields {
            stage: self.stage,
            score: self.score,
        }
    }
}

#[tokio::test]
async fn test_content_keys_invalidate_on_tracked_change() {
    let cache = create_test_cache(10);
    let calls = Arc::new(AtomicUsize::new(0));

    let mut leads = vec![
        Lead { id: 1, stage: "new", score: 10, notes: String::new() },
        Lead { id: 2, stage: "qualified", score: 70, notes: String::new() },
    ];

    let summarize = |leads: &[Lead], calls: Arc<AtomicUsize>| {
        let count = leads.len();
        move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, anyhow::Error>(format!("{count} leads"))
        }
    };

    let key = ContentKey::for_items("pipeline", "user-1", "digest", &leads).unwrap().to_string();
    cache.get_or_fetch(&key, GetOptions::new(), summarize(&leads, calls.clone())).await.unwrap();

    // Untracked edit and reordering reuse the entry
    leads[0].notes = "called twice".to_string();
    leads.reverse();
    let same = ContentKey::for_items("pipeline", "user-1", "digest", &leads).unwrap().to_string();
    assert_eq!(same, key);
    cache.get_or_fetch(&same, GetOptions::new(), summarize(&leads, calls.clone())).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Tracked edit produces a new key
    leads[1].stage = "won";
    let changed = ContentKey::for_items("pipeline", "user-1", "digest", &leads).unwrap().to_string();
    assert_ne!(changed, key);
    cache.get_or_fetch(&changed, GetOptions::new(), summarize(&leads, calls.clone())).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    assert_eq!(cache.invalidate_by_owner("user-1").await, 2);
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_stats_reflect_activity() {
    let cache = create_test_cache(2);

    cache.set("a", "1".to_string(), None).await;
    cache.get("a").await;
    cache.get("missing").await;
    cache.set("b", "2".to_string(), None).await;
    cache.set("c", "3".to_string(), None).await;

    let stats = cache.stats().await;
    assert_eq!(stats.size, 2);
    assert_eq!(stats.max_size, 2);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.evictions, 1);
}
