//! Route definitions and handlers.

pub mod alerts;
pub mod engines;
pub mod events;
pub mod health;
pub mod status;
pub mod thresholds;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// GET  /health                    service + database health
/// GET  /status                    current dashboard snapshot
/// GET  /events                    recent events feed
/// POST /events                    author an operational event
/// GET  /events/stream             SSE live-update stream
/// GET  /alerts                    unresolved alerts
/// GET  /alerts/stats              active alert counts
/// POST /alerts/{id}/acknowledge   acknowledge an active alert
/// POST /alerts/{id}/resolve       resolve an alert
/// GET  /engines                   registered engines
/// PUT  /engines                   register / update an engine
/// GET  /engines/{id}/history      telemetry history for one engine
/// GET  /thresholds                threshold rules
/// PUT  /thresholds                upsert a threshold rule
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(status::router())
        .merge(events::router())
        .merge(alerts::router())
        .merge(engines::router())
        .merge(thresholds::router())
}
