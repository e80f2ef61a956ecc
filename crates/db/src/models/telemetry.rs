//! Telemetry entity models (append-only time series).

use gridwatch_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A persisted telemetry sample.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TelemetrySample {
    pub id: DbId,
    pub engine_id: String,
    pub time: Timestamp,
    pub power_kw: f64,
    pub temp_exhaust: f64,
    pub gas_consumption: f64,
    pub vibration: f64,
    pub gas_pressure: f64,
    pub created_at: Timestamp,
}

/// DTO for inserting a new telemetry row.
///
/// Immutable once ingested; there is deliberately no update DTO.
#[derive(Debug, Clone)]
pub struct CreateTelemetrySample {
    pub engine_id: String,
    pub time: Timestamp,
    pub power_kw: f64,
    pub temp_exhaust: f64,
    pub gas_consumption: f64,
    pub vibration: f64,
    pub gas_pressure: f64,
}

/// Latest sample per engine, as returned by the `DISTINCT ON` aggregate query.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LatestTelemetry {
    pub engine_id: String,
    pub time: Timestamp,
    pub power_kw: f64,
    pub temp_exhaust: f64,
    pub gas_consumption: f64,
    pub vibration: f64,
    pub gas_pressure: f64,
}
