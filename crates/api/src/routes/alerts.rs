//! Alert listing and the human lifecycle transitions.
//!
//! Core alerting never goes through this surface — alerts are created by
//! the ingestion pipeline. These endpoints expose them and let an operator
//! acknowledge or resolve them.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use gridwatch_core::cache_keys;
use gridwatch_core::error::CoreError;
use gridwatch_core::types::DbId;
use gridwatch_db::models::alert::{Alert, AlertStats};
use gridwatch_db::repositories::AlertRepo;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /alerts — unresolved alerts, newest first.
async fn list_alerts(State(state): State<AppState>) -> AppResult<Json<DataResponse<Vec<Alert>>>> {
    let alerts = state
        .cache
        .get_or_compute(cache_keys::ALERTS_ACTIVE, cache_keys::TTL_SHORT, || {
            AlertRepo::list_unresolved(&state.pool)
        })
        .await?;
    Ok(Json(DataResponse { data: alerts }))
}

/// GET /alerts/stats — active alert counts by severity.
async fn alert_stats(State(state): State<AppState>) -> AppResult<Json<DataResponse<AlertStats>>> {
    let stats = state
        .cache
        .get_or_compute(cache_keys::ALERTS_STATS, cache_keys::TTL_SHORT, || {
            AlertRepo::stats(&state.pool)
        })
        .await?;
    Ok(Json(DataResponse { data: stats }))
}

/// POST /alerts/{id}/acknowledge — mark an active alert as seen.
async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Alert>>> {
    let alert = AlertRepo::acknowledge(&state.pool, id)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "alert",
            id: id.to_string(),
        })?;

    state.cache.delete_by_pattern("gridwatch:alerts:*").await;
    Ok(Json(DataResponse { data: alert }))
}

/// POST /alerts/{id}/resolve — close an alert from the operator side.
async fn resolve_alert(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Alert>>> {
    let alert = AlertRepo::resolve(&state.pool, id)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "alert",
            id: id.to_string(),
        })?;

    state.cache.delete_by_pattern("gridwatch:alerts:*").await;
    Ok(Json(DataResponse { data: alert }))
}

/// Mount alert routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/alerts", get(list_alerts))
        .route("/alerts/stats", get(alert_stats))
        .route("/alerts/{id}/acknowledge", post(acknowledge_alert))
        .route("/alerts/{id}/resolve", post(resolve_alert))
}
