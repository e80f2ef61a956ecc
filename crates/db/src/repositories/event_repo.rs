//! Repository for the `events` table.

use gridwatch_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::event::{CreateEvent, EngineEvent};

/// Column list for `events` queries.
const COLUMNS: &str = "id, time, level, message, engine_id";

/// Provides query operations for operational events.
pub struct EventRepo;

impl EventRepo {
    /// Insert a new event row.
    pub async fn insert(pool: &PgPool, event: &CreateEvent) -> Result<EngineEvent, sqlx::Error> {
        let query = format!(
            "INSERT INTO events (time, level, message, engine_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EngineEvent>(&query)
            .bind(event.time)
            .bind(&event.level)
            .bind(&event.message)
            .bind(&event.engine_id)
            .fetch_one(pool)
            .await
    }

    /// List recent events, newest first.
    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<EngineEvent>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM events ORDER BY time DESC LIMIT $1");
        sqlx::query_as::<_, EngineEvent>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Delete events older than the given cutoff timestamp.
    ///
    /// Returns the number of rows deleted.
    pub async fn delete_older_than(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM events WHERE time < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
