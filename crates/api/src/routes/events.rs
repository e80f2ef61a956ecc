//! Event feed endpoints: recent events, externally authored events, and
//! the SSE live-update stream.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use futures::stream::Stream;
use futures::StreamExt;
use gridwatch_broadcast::{DashboardSnapshot, Subscription};
use gridwatch_core::cache_keys;
use gridwatch_db::models::event::{CreateEvent, EngineEvent};
use gridwatch_db::repositories::EventRepo;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// SSE comment heartbeat interval; keeps the connection alive through
/// proxies and lets dead connections surface as send errors.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Levels accepted from external event authors. Bus ingestion is laxer and
/// stores unknown levels verbatim.
const EVENT_LEVELS: &[&str] = &["info", "warning", "error"];

// ---------------------------------------------------------------------------
// Recent events feed
// ---------------------------------------------------------------------------

/// Query parameters for the events feed.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// How many events to return (default: 10, max: 100).
    pub limit: Option<i64>,
}

/// GET /events — recent events, newest first, served through the cache.
async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> AppResult<Json<DataResponse<Vec<EngineEvent>>>> {
    let limit = query.limit.unwrap_or(10).clamp(1, 100);

    let events = state
        .cache
        .get_or_compute(
            &cache_keys::events_latest(limit),
            cache_keys::TTL_SHORT,
            || EventRepo::list_recent(&state.pool, limit),
        )
        .await?;
    Ok(Json(DataResponse { data: events }))
}

// ---------------------------------------------------------------------------
// External event authoring
// ---------------------------------------------------------------------------

/// Request body for authoring an event.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    /// Length-capped to keep stored messages bounded.
    #[validate(length(min = 1, max = 500))]
    pub message: String,
    pub level: String,
    pub engine_id: Option<String>,
}

/// POST /events — record an externally authored event.
///
/// Unlike bus ingestion, the level here is validated against the known set.
async fn create_event(
    State(state): State<AppState>,
    Json(input): Json<CreateEventRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<EngineEvent>>)> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if !EVENT_LEVELS.contains(&input.level.as_str()) {
        return Err(AppError::BadRequest(format!(
            "Invalid level '{}'. Must be one of: {}",
            input.level,
            EVENT_LEVELS.join(", ")
        )));
    }

    let event = EventRepo::insert(
        &state.pool,
        &CreateEvent {
            time: Utc::now(),
            level: input.level,
            message: input.message,
            engine_id: input.engine_id,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: event })))
}

// ---------------------------------------------------------------------------
// SSE live-update stream
// ---------------------------------------------------------------------------

/// `full` frame sent once on connect.
#[derive(Serialize)]
struct FullFrame<'a> {
    #[serde(flatten)]
    snapshot: &'a DashboardSnapshot,
    timestamp: String,
}

/// `diff` frame sent on every broadcast refresh.
#[derive(Serialize)]
struct DiffFrame<'a> {
    r#type: &'static str,
    #[serde(flatten)]
    snapshot: &'a DashboardSnapshot,
    timestamp: String,
    /// Opaque per-frame nonce; lets clients detect frame boundaries, carries
    /// no ordering meaning.
    nonce: String,
}

/// GET /events/stream — server-push channel for dashboard observers.
///
/// Emits a `full` event with the current snapshot on connect, then a `diff`
/// event per broadcast refresh. Dropping the connection drops the
/// subscription, which deregisters the observer.
async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    // Register before fetching the initial snapshot so a refresh landing in
    // between is not lost.
    let subscription = state.broadcaster.subscribe();

    let initial = match state.broadcaster.current().await {
        Ok(snapshot) => full_frame(&snapshot),
        Err(e) => {
            // The client keeps the stream; the first diff will catch it up.
            tracing::warn!(error = %e, "No snapshot available for SSE connect");
            None
        }
    };

    let diffs = futures::stream::unfold(subscription, |mut sub: Subscription| async move {
        loop {
            let snapshot = sub.recv().await?;
            if let Some(frame) = diff_frame(&snapshot) {
                return Some((frame, sub));
            }
        }
    });

    let stream = futures::stream::iter(initial)
        .chain(diffs)
        .map(Ok::<_, Infallible>);

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}

fn full_frame(snapshot: &DashboardSnapshot) -> Option<SseEvent> {
    let frame = FullFrame {
        snapshot,
        timestamp: Utc::now().to_rfc3339(),
    };
    match SseEvent::default().event("full").json_data(&frame) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode full frame");
            None
        }
    }
}

fn diff_frame(snapshot: &DashboardSnapshot) -> Option<SseEvent> {
    let frame = DiffFrame {
        r#type: "diff",
        snapshot,
        timestamp: Utc::now().to_rfc3339(),
        nonce: uuid::Uuid::new_v4().simple().to_string(),
    };
    match SseEvent::default().event("diff").json_data(&frame) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode diff frame");
            None
        }
    }
}

/// Mount event routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/stream", get(stream_events))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn request(level: &str, message: &str) -> CreateEventRequest {
        CreateEventRequest {
            message: message.to_string(),
            level: level.to_string(),
            engine_id: None,
        }
    }

    #[test]
    fn known_levels_pass_validation() {
        for level in EVENT_LEVELS {
            assert!(request(level, "msg").validate().is_ok());
            assert!(EVENT_LEVELS.contains(level));
        }
    }

    #[test]
    fn empty_and_oversized_messages_are_rejected() {
        assert!(request("info", "").validate().is_err());
        assert!(request("info", &"x".repeat(501)).validate().is_err());
        assert!(request("info", &"x".repeat(500)).validate().is_ok());
    }

    #[test]
    fn unknown_level_is_not_in_the_allowed_set() {
        assert!(!EVENT_LEVELS.contains(&"fault"));
    }
}
