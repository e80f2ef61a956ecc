//! Periodic reclamation of expired in-process cache entries.
//!
//! Reads already treat expired entries as absent, so the sweeper exists only
//! to bound memory. Runs on a fixed interval until cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::store::TieredCache;

/// Run the sweep loop.
pub async fn run_sweeper(cache: Arc<TieredCache>, interval: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = interval.as_secs(), "Cache sweeper started");

    let mut ticker = tokio::time::interval(interval);
    // The first tick fires immediately; an empty sweep is harmless.
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Cache sweeper stopping");
                break;
            }
            _ = ticker.tick() => {
                let removed = cache.sweep_expired();
                if removed > 0 {
                    tracing::debug!(removed, "Swept expired cache entries");
                }
            }
        }
    }
}
