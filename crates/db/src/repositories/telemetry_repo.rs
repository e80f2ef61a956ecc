//! Repository for the `telemetry` table (append-only time series).

use gridwatch_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::telemetry::{CreateTelemetrySample, LatestTelemetry, TelemetrySample};

/// Column list for `telemetry` SELECT queries (includes `id` and `created_at`).
const COLUMNS: &str = "\
    id, engine_id, time, \
    power_kw, temp_exhaust, gas_consumption, vibration, gas_pressure, \
    created_at";

/// Column list for `telemetry` INSERT statements (excludes auto-generated columns).
const INSERT_COLUMNS: &str = "\
    engine_id, time, power_kw, temp_exhaust, gas_consumption, vibration, gas_pressure";

/// Provides query operations for telemetry samples.
pub struct TelemetryRepo;

impl TelemetryRepo {
    /// Insert a single telemetry sample.
    pub async fn insert(
        pool: &PgPool,
        sample: &CreateTelemetrySample,
    ) -> Result<TelemetrySample, sqlx::Error> {
        let query = format!(
            "INSERT INTO telemetry ({INSERT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TelemetrySample>(&query)
            .bind(&sample.engine_id)
            .bind(sample.time)
            .bind(sample.power_kw)
            .bind(sample.temp_exhaust)
            .bind(sample.gas_consumption)
            .bind(sample.vibration)
            .bind(sample.gas_pressure)
            .fetch_one(pool)
            .await
    }

    /// Get the latest sample per engine.
    ///
    /// Uses `DISTINCT ON` to efficiently select the most recent row per
    /// engine id.
    pub async fn latest_per_engine(pool: &PgPool) -> Result<Vec<LatestTelemetry>, sqlx::Error> {
        let query = "\
            SELECT DISTINCT ON (engine_id) \
                engine_id, time, \
                power_kw, temp_exhaust, gas_consumption, vibration, gas_pressure \
            FROM telemetry \
            ORDER BY engine_id, time DESC";
        sqlx::query_as::<_, LatestTelemetry>(query)
            .fetch_all(pool)
            .await
    }

    /// Get samples for an engine since a cutoff, newest first.
    pub async fn list_for_engine(
        pool: &PgPool,
        engine_id: &str,
        since: Timestamp,
    ) -> Result<Vec<TelemetrySample>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM telemetry \
             WHERE engine_id = $1 AND time >= $2 \
             ORDER BY time DESC"
        );
        sqlx::query_as::<_, TelemetrySample>(&query)
            .bind(engine_id)
            .bind(since)
            .fetch_all(pool)
            .await
    }

    /// Delete samples older than the given cutoff timestamp.
    ///
    /// Returns the number of rows deleted.
    pub async fn delete_older_than(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM telemetry WHERE time < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
