//! Alert entity models.

use gridwatch_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A threshold-violation alert.
///
/// Created by the ingestion pipeline; transitions to `resolved`
/// automatically when the triggering metric returns to normal, or to
/// `acknowledged`/`resolved` through the HTTP surface.
///
/// `Deserialize` is derived because alert listings pass through the tiered
/// cache.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Alert {
    pub id: DbId,
    pub engine_id: String,
    pub metric: String,
    pub severity: String,
    pub status: String,
    pub title: String,
    pub message: String,
    pub actual_value: f64,
    pub threshold_value: f64,
    pub created_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}

/// DTO for inserting a new active alert.
#[derive(Debug, Clone)]
pub struct CreateAlert {
    pub engine_id: String,
    pub metric: String,
    pub severity: String,
    pub title: String,
    pub message: String,
    pub actual_value: f64,
    pub threshold_value: f64,
}

/// Active alert counts grouped by severity.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AlertStats {
    pub active_total: i64,
    pub active_warning: i64,
    pub active_critical: i64,
}
