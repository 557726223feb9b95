//! Adaptive Cache demo
//!
//! Composition root: builds one cache from the environment, shares it with a
//! simulated board-summary service, and stops the cleanup task on shutdown.

use std::time::Duration;

use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adaptive_cache::{Cache, CacheConfig, ContentKey, GetOptions, TrackedFields};

#[derive(Debug, Clone)]
struct Task {
    id: u32,
    title: String,
    status: &'static str,
    priority: u8,
}

#[derive(Serialize)]
struct TaskFields {
    status: &'static str,
    priority: u8,
}

impl TrackedFields for Task {
    type Projection = TaskFields;

    fn identity(&self) -> String {
        self.id.to_string()
    }

    fn project(&self) -> Self::Projection {
        TaskFields {
            status: self.status,
            priority: self.priority,
        }
    }
}

/// Stands in for an LLM call summarizing a board.
async fn summarize(tasks: Vec<Task>) -> anyhow::Result<String> {
    tokio::time::sleep(Duration::from_millis(200)).await;
    let done = tasks.iter().filter(|t| t.status == "done").count();
    let next = tasks
        .iter()
        .find(|t| t.status != "done")
        .map(|t| t.title.as_str())
        .unwrap_or("nothing");
    Ok(format!("{done} of {} tasks done, next up: {next}", tasks.len()))
}

async fn board_summary(cache: &Cache<String>, owner_id: &str, tasks: &[Task]) -> anyhow::Result<String> {
    let key = ContentKey::for_items("board", owner_id, "summary", tasks)?.to_string();
    let snapshot = tasks.to_vec();
    let summary = cache
        .get_or_fetch(&key, GetOptions::new(), move || summarize(snapshot))
        .await?;
    info!(key = %key, summary = %summary, "board summary");
    Ok(summary)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adaptive_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CacheConfig::from_env();
    info!(
        max_size = config.max_size,
        default_ttl_ms = config.default_ttl_ms,
        cleanup_interval_ms = config.cleanup_interval_ms,
        stale_while_revalidate = config.stale_while_revalidate,
        "configuration loaded"
    );

    let cache: Cache<String> = Cache::new(config)?;
    cache.start_cleanup();

    let mut tasks: Vec<Task> = (1..=3)
        .map(|id| Task {
            id,
            title: format!("task {id}"),
            status: "todo",
            priority: 1,
        })
        .collect();

    board_summary(&cache, "7", &tasks).await?;
    // Same tracked fields, served from cache
    tasks[0].title = "renamed".to_string();
    board_summary(&cache, "7", &tasks).await?;
    // Tracked field changed, new key
    tasks[1].status = "done";
    board_summary(&cache, "7", &tasks).await?;

    let removed = cache.invalidate_by_owner("7").await;
    info!(removed, "owner edited their board");

    let stats = cache.stats().await;
    info!(stats = %serde_json::to_string(&stats)?, hit_rate = stats.hit_rate(), "cache stats");

    cache.stop_cleanup();
    info!("shutdown complete");
    Ok(())
}
