//! Periodic cleanup of old telemetry and event rows.
//!
//! Spawns a background task that deletes rows older than the configured
//! retention period. Runs on a fixed interval using `tokio::time::interval`.

use std::time::Duration;

use chrono::Utc;
use gridwatch_db::repositories::{EventRepo, TelemetryRepo};
use gridwatch_db::DbPool;
use tokio_util::sync::CancellationToken;

/// Default retention period: 24 hours.
const DEFAULT_RETENTION_HOURS: i64 = 24;

/// How often the cleanup job runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600); // 1 hour

/// Run the retention cleanup loop.
///
/// Deletes telemetry and event rows older than `retention_hours`
/// (defaults to 24). Runs until `cancel` is triggered.
pub async fn run(pool: DbPool, cancel: CancellationToken) {
    let retention_hours: i64 = std::env::var("RETENTION_HOURS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_RETENTION_HOURS);

    tracing::info!(
        retention_hours,
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "Retention job started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Retention job stopping");
                break;
            }
            _ = interval.tick() => {
                let cutoff = Utc::now() - chrono::Duration::hours(retention_hours);

                match TelemetryRepo::delete_older_than(&pool, cutoff).await {
                    Ok(deleted) if deleted > 0 => {
                        tracing::info!(deleted, "Retention: purged old telemetry rows");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "Retention: telemetry cleanup failed");
                    }
                }

                match EventRepo::delete_older_than(&pool, cutoff).await {
                    Ok(deleted) if deleted > 0 => {
                        tracing::info!(deleted, "Retention: purged old event rows");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "Retention: event cleanup failed");
                    }
                }
            }
        }
    }
}
