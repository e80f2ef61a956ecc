//! Repository for the `alerts` table.

use gridwatch_core::types::DbId;
use sqlx::PgPool;

use crate::models::alert::{Alert, AlertStats, CreateAlert};

/// Column list for `alerts` queries.
const COLUMNS: &str = "\
    id, engine_id, metric, severity, status, title, message, \
    actual_value, threshold_value, created_at, resolved_at";

/// Column list for INSERT (excludes auto-generated columns).
const INSERT_COLUMNS: &str = "\
    engine_id, metric, severity, title, message, actual_value, threshold_value";

/// Provides query operations for alerts.
pub struct AlertRepo;

impl AlertRepo {
    /// Insert a new active alert.
    pub async fn insert(pool: &PgPool, alert: &CreateAlert) -> Result<Alert, sqlx::Error> {
        let query = format!(
            "INSERT INTO alerts ({INSERT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(&alert.engine_id)
            .bind(&alert.metric)
            .bind(&alert.severity)
            .bind(&alert.title)
            .bind(&alert.message)
            .bind(alert.actual_value)
            .bind(alert.threshold_value)
            .fetch_one(pool)
            .await
    }

    /// Resolve every active alert for an (engine, metric) pair, regardless
    /// of severity.
    ///
    /// Idempotent: resolving when nothing is active updates zero rows.
    /// Returns the number of alerts resolved.
    pub async fn resolve_active_for_metric(
        pool: &PgPool,
        engine_id: &str,
        metric: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE alerts SET status = 'resolved', resolved_at = NOW() \
             WHERE engine_id = $1 AND metric = $2 AND status = 'active'",
        )
        .bind(engine_id)
        .bind(metric)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// List unresolved alerts (active and acknowledged), newest first.
    pub async fn list_unresolved(pool: &PgPool) -> Result<Vec<Alert>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alerts \
             WHERE status IN ('active', 'acknowledged') \
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Alert>(&query).fetch_all(pool).await
    }

    /// Acknowledge an active alert. Returns `None` if the alert does not
    /// exist or is not active.
    pub async fn acknowledge(pool: &PgPool, id: DbId) -> Result<Option<Alert>, sqlx::Error> {
        let query = format!(
            "UPDATE alerts SET status = 'acknowledged' \
             WHERE id = $1 AND status = 'active' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Resolve an alert through the HTTP surface. Returns `None` if the
    /// alert does not exist or is already resolved.
    pub async fn resolve(pool: &PgPool, id: DbId) -> Result<Option<Alert>, sqlx::Error> {
        let query = format!(
            "UPDATE alerts SET status = 'resolved', resolved_at = NOW() \
             WHERE id = $1 AND status IN ('active', 'acknowledged') \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Count active alerts, total and by severity.
    pub async fn stats(pool: &PgPool) -> Result<AlertStats, sqlx::Error> {
        sqlx::query_as::<_, AlertStats>(
            "SELECT \
                COUNT(*) FILTER (WHERE status = 'active') AS active_total, \
                COUNT(*) FILTER (WHERE status = 'active' AND severity = 'warning') AS active_warning, \
                COUNT(*) FILTER (WHERE status = 'active' AND severity = 'critical') AS active_critical \
             FROM alerts",
        )
        .fetch_one(pool)
        .await
    }
}
