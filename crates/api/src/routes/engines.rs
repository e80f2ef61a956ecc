//! Engine registry and telemetry history endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Duration, Utc};
use gridwatch_core::error::CoreError;
use gridwatch_db::models::engine::{Engine, UpsertEngine};
use gridwatch_db::models::telemetry::TelemetrySample;
use gridwatch_db::repositories::{EngineRepo, TelemetryRepo};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for the telemetry history endpoint.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// How many hours of history to return (default: 1).
    pub hours: Option<i64>,
}

/// GET /engines — list all registered engines.
async fn list_engines(State(state): State<AppState>) -> AppResult<Json<DataResponse<Vec<Engine>>>> {
    let engines = EngineRepo::list_all(&state.pool).await?;
    Ok(Json(DataResponse { data: engines }))
}

/// PUT /engines — register an engine or update its model/hours.
async fn upsert_engine(
    State(state): State<AppState>,
    Json(input): Json<UpsertEngine>,
) -> AppResult<(StatusCode, Json<DataResponse<Engine>>)> {
    if input.id.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "engine id is required".to_string(),
        )));
    }

    let engine = EngineRepo::upsert(&state.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: engine })))
}

/// GET /engines/{id}/history — telemetry samples for one engine.
async fn engine_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<DataResponse<Vec<TelemetrySample>>>> {
    let hours = query.hours.unwrap_or(1);
    if !(1..=168).contains(&hours) {
        return Err(AppError::BadRequest(
            "hours must be between 1 and 168".to_string(),
        ));
    }

    if EngineRepo::get(&state.pool, &id).await?.is_none() {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "engine",
            id,
        }));
    }

    let since = Utc::now() - Duration::hours(hours);
    let samples = TelemetryRepo::list_for_engine(&state.pool, &id, since).await?;
    Ok(Json(DataResponse { data: samples }))
}

/// Mount engine routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/engines", get(list_engines).put(upsert_engine))
        .route("/engines/{id}/history", get(engine_history))
}
