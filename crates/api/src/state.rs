use std::sync::Arc;

use gridwatch_broadcast::BroadcastCoordinator;
use gridwatch_cache::TieredCache;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: gridwatch_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Tiered cache shared by handlers and the broadcast layer.
    pub cache: Arc<TieredCache>,
    /// Broadcast coordinator feeding the SSE stream and status endpoint.
    pub broadcaster: BroadcastCoordinator,
}
