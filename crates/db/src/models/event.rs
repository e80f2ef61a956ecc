//! Operational event entity models.

use gridwatch_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An operational event (engine fault, operator note, simulator output).
///
/// `level` is stored verbatim at ingestion; only the authoring HTTP endpoint
/// validates it against the known set.
///
/// `Deserialize` is derived because event lists ride inside cached dashboard
/// snapshots.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EngineEvent {
    pub id: DbId,
    pub time: Timestamp,
    pub level: String,
    pub message: String,
    pub engine_id: Option<String>,
}

/// DTO for inserting a new event row.
#[derive(Debug, Clone)]
pub struct CreateEvent {
    pub time: Timestamp,
    pub level: String,
    pub message: String,
    pub engine_id: Option<String>,
}
