//! Shared cache key builders and TTLs.
//!
//! Keys are namespaced under `gridwatch:` so a shared remote store can host
//! multiple deployments. TTLs mirror the refresh cadences of their producers:
//! the dashboard snapshot TTL is slightly shorter than the broadcast refresh
//! interval so each refresh sees fresh data while concurrent readers inside
//! one interval share a single fetch.

use std::time::Duration;

/// Aggregate dashboard snapshot shared by the broadcast refresh and the
/// status endpoint.
pub const DASHBOARD_DATA: &str = "gridwatch:dashboard:data";

/// Active alert listing.
pub const ALERTS_ACTIVE: &str = "gridwatch:alerts:active";

/// Alert statistics.
pub const ALERTS_STATS: &str = "gridwatch:alerts:stats";

/// Health check result.
pub const HEALTH: &str = "gridwatch:health";

/// Latest events feed, keyed by requested limit.
pub fn events_latest(limit: i64) -> String {
    format!("gridwatch:events:latest:{limit}")
}

/// Near-real-time data (event feed).
pub const TTL_SHORT: Duration = Duration::from_secs(2);

/// Health probe results.
pub const TTL_HEALTH: Duration = Duration::from_secs(5);

/// Dashboard snapshot; kept below the broadcast refresh interval.
pub const TTL_DASHBOARD: Duration = Duration::from_secs(8);
