//! Snapshot acquisition behind a trait so the coordinator can be tested
//! without a database.

use std::sync::Arc;

use async_trait::async_trait;
use gridwatch_cache::TieredCache;
use gridwatch_core::cache_keys;
use gridwatch_db::DbPool;

use crate::snapshot::{build_snapshot, DashboardSnapshot};

/// Produces the current dashboard snapshot on demand.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> anyhow::Result<DashboardSnapshot>;
}

/// Production source: cache-aside read over the durable store.
///
/// The cache TTL is slightly shorter than the broadcast refresh interval, so
/// each timed refresh sees fresh data while concurrent readers inside one
/// interval (SSE connects, the status endpoint) share a single fetch.
pub struct CachedSnapshotSource {
    pool: DbPool,
    cache: Arc<TieredCache>,
}

impl CachedSnapshotSource {
    pub fn new(pool: DbPool, cache: Arc<TieredCache>) -> Self {
        Self { pool, cache }
    }
}

#[async_trait]
impl SnapshotSource for CachedSnapshotSource {
    async fn fetch(&self) -> anyhow::Result<DashboardSnapshot> {
        let snapshot = self
            .cache
            .get_or_compute(cache_keys::DASHBOARD_DATA, cache_keys::TTL_DASHBOARD, || {
                let pool = self.pool.clone();
                async move { build_snapshot(&pool).await }
            })
            .await?;
        Ok(snapshot)
    }
}
