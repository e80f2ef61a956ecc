//! Current dashboard snapshot endpoint.

use axum::extract::State;
use axum::{routing::get, Json, Router};
use gridwatch_broadcast::DashboardSnapshot;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /status — the same aggregate state the SSE stream broadcasts.
///
/// Served cache-aside with the broadcast refresh key, so polling this
/// endpoint does not contend with the refresh cycle for backing-store
/// fetches.
async fn get_status(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<DashboardSnapshot>>> {
    let snapshot = state
        .broadcaster
        .current()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(DataResponse {
        data: (*snapshot).clone(),
    }))
}

/// Mount status routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/status", get(get_status))
}
