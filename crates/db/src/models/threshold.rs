//! Threshold rule entity models.

use gridwatch_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored threshold rule row.
///
/// `compare_op` holds the stable string form of
/// [`CompareOp`](gridwatch_core::thresholds::CompareOp).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ThresholdRuleRow {
    pub id: DbId,
    pub metric: String,
    pub compare_op: String,
    pub warning_value: f64,
    pub critical_value: f64,
    pub is_enabled: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for upserting a threshold rule.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertThresholdRule {
    pub metric: String,
    pub compare_op: String,
    pub warning_value: f64,
    pub critical_value: f64,
}
