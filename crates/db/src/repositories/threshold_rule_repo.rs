//! Repository for the `threshold_rules` table.

use sqlx::PgPool;

use crate::models::threshold::{ThresholdRuleRow, UpsertThresholdRule};

/// Column list for `threshold_rules` queries.
const COLUMNS: &str = "\
    id, metric, compare_op, warning_value, critical_value, \
    is_enabled, created_at, updated_at";

/// Provides query operations for threshold rules.
pub struct ThresholdRuleRepo;

impl ThresholdRuleRepo {
    /// List all rules ordered by metric name.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<ThresholdRuleRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM threshold_rules ORDER BY metric");
        sqlx::query_as::<_, ThresholdRuleRow>(&query)
            .fetch_all(pool)
            .await
    }

    /// List enabled rules only, as consumed by the evaluator.
    pub async fn list_enabled(pool: &PgPool) -> Result<Vec<ThresholdRuleRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM threshold_rules WHERE is_enabled ORDER BY metric");
        sqlx::query_as::<_, ThresholdRuleRow>(&query)
            .fetch_all(pool)
            .await
    }

    /// Upsert a rule keyed by metric name.
    pub async fn upsert(
        pool: &PgPool,
        rule: &UpsertThresholdRule,
    ) -> Result<ThresholdRuleRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO threshold_rules (metric, compare_op, warning_value, critical_value) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (metric) DO UPDATE SET \
                compare_op = EXCLUDED.compare_op, \
                warning_value = EXCLUDED.warning_value, \
                critical_value = EXCLUDED.critical_value, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ThresholdRuleRow>(&query)
            .bind(&rule.metric)
            .bind(&rule.compare_op)
            .bind(rule.warning_value)
            .bind(rule.critical_value)
            .fetch_one(pool)
            .await
    }
}
