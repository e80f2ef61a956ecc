//! Health check endpoint.
//!
//! The database probe runs with a bounded timeout and the result is cached
//! briefly so dashboards polling `/api/health` do not hammer the store.

use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use gridwatch_core::cache_keys;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Database probe timeout.
const DB_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Health check response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `ok` or `error`.
    pub status: String,
    /// Crate version from Cargo.toml.
    pub version: String,
    /// Whether the database probe succeeded within the timeout.
    pub db_healthy: bool,
    /// Probe round-trip in milliseconds, when it succeeded.
    pub db_latency_ms: Option<u64>,
}

/// GET /health — returns service and database health.
///
/// Responds 503 when the database is unreachable.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    if let Some(cached) = state.cache.get::<HealthResponse>(cache_keys::HEALTH).await {
        let code = status_code(&cached);
        return (code, Json(cached));
    }

    let started = std::time::Instant::now();
    let probe =
        tokio::time::timeout(DB_PROBE_TIMEOUT, gridwatch_db::health_check(&state.pool)).await;

    let (db_healthy, db_latency_ms) = match probe {
        Ok(Ok(())) => (true, Some(started.elapsed().as_millis() as u64)),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Health probe failed");
            (false, None)
        }
        Err(_) => {
            tracing::warn!(timeout_secs = DB_PROBE_TIMEOUT.as_secs(), "Health probe timed out");
            (false, None)
        }
    };

    let response = HealthResponse {
        status: if db_healthy { "ok" } else { "error" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        db_healthy,
        db_latency_ms,
    };

    state
        .cache
        .set(cache_keys::HEALTH, &response, cache_keys::TTL_HEALTH)
        .await;

    (status_code(&response), Json(response))
}

fn status_code(response: &HealthResponse) -> StatusCode {
    if response.db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Mount health check routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
