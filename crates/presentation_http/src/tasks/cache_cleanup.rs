//! Shared store cleanup task
//!
//! Expired entries of the shared store are invisible to reads but still
//! occupy the file until removed; this task purges them periodically.

use std::{sync::Arc, time::Duration};

use infrastructure::RedbCache;
use tracing::{debug, error, info};

/// Default cleanup interval: every five minutes
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 300;

/// Spawn a background task that periodically purges expired shared entries
///
/// Returns a `JoinHandle` that can be used to abort the task when shutting down.
pub fn spawn_cache_cleanup_task(
    cache: Arc<RedbCache>,
    cleanup_interval: Option<Duration>,
) -> tokio::task::JoinHandle<()> {
    let interval = cleanup_interval.unwrap_or(Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS));

    info!(
        interval_secs = interval.as_secs(),
        "Starting shared cache cleanup task"
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // Don't run immediately on startup
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let cache = Arc::clone(&cache);
            match tokio::task::spawn_blocking(move || cache.cleanup_expired()).await {
                Ok(Ok(removed)) if removed > 0 => {
                    info!(removed_count = removed, "Purged expired shared cache entries");
                },
                Ok(Ok(_)) => debug!("No expired shared cache entries"),
                Ok(Err(e)) => error!(error = %e, "Failed to purge shared cache"),
                Err(e) => error!(error = %e, "Shared cache cleanup panicked"),
            }
        }
    })
}
