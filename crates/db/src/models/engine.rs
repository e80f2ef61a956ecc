//! Engine entity models.

use gridwatch_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A monitored engine.
///
/// `status` holds the stable string form of
/// [`EngineStatus`](gridwatch_core::EngineStatus); it is a current-value
/// projection overwritten after every telemetry sample.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Engine {
    pub id: String,
    pub model: String,
    pub status: String,
    pub total_hours: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for registering or updating an engine.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertEngine {
    pub id: String,
    pub model: String,
    pub total_hours: i64,
}
