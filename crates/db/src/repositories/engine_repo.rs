//! Repository for the `engines` table.

use gridwatch_core::EngineStatus;
use sqlx::PgPool;

use crate::models::engine::{Engine, UpsertEngine};

/// Column list for `engines` queries.
const COLUMNS: &str = "id, model, status, total_hours, created_at, updated_at";

/// Provides query operations for engines.
pub struct EngineRepo;

impl EngineRepo {
    /// List all engines ordered by id.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Engine>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM engines ORDER BY id");
        sqlx::query_as::<_, Engine>(&query).fetch_all(pool).await
    }

    /// Get a single engine by id.
    pub async fn get(pool: &PgPool, id: &str) -> Result<Option<Engine>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM engines WHERE id = $1");
        sqlx::query_as::<_, Engine>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Register an engine, or update its model and hours if it exists.
    ///
    /// The status column is left untouched on conflict; it belongs to the
    /// ingestion pipeline.
    pub async fn upsert(pool: &PgPool, engine: &UpsertEngine) -> Result<Engine, sqlx::Error> {
        let query = format!(
            "INSERT INTO engines (id, model, total_hours) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET \
                model = EXCLUDED.model, \
                total_hours = EXCLUDED.total_hours, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Engine>(&query)
            .bind(&engine.id)
            .bind(&engine.model)
            .bind(engine.total_hours)
            .fetch_one(pool)
            .await
    }

    /// Overwrite an engine's health status.
    ///
    /// Returns the number of rows updated; zero means the engine is not
    /// registered, which callers treat as non-fatal.
    pub async fn set_status(
        pool: &PgPool,
        id: &str,
        status: EngineStatus,
    ) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("UPDATE engines SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(status.as_str())
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }
}
