//! Access log repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use linkgate_core::error::{AppError, ErrorKind};
use linkgate_core::result::AppResult;
use linkgate_core::types::pagination::LogCursor;
use linkgate_entity::audit::AccessLogEntry;

use super::AccessLogStore;

/// PostgreSQL repository for the append-only access log.
#[derive(Debug, Clone)]
pub struct AccessLogRepository {
    pool: PgPool,
}

impl AccessLogRepository {
    /// Create a new access log repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessLogStore for AccessLogRepository {
    async fn append(&self, entry: &AccessLogEntry) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO access_logs (log_id, resource_id, file_id, requester_id, ip_address, \
             action, \"timestamp\", metadata, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&entry.log_id)
        .bind(&entry.resource_id)
        .bind(&entry.file_id)
        .bind(&entry.requester_id)
        .bind(&entry.ip_address)
        .bind(entry.action)
        .bind(entry.timestamp)
        .bind(&entry.metadata)
        .bind(entry.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to append access log entry", e)
        })?;
        Ok(())
    }

    async fn find_page(
        &self,
        resource_id: &str,
        after: Option<&LogCursor>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<AccessLogEntry>> {
        sqlx::query_as::<_, AccessLogEntry>(
            "SELECT * FROM access_logs \
             WHERE resource_id = $1 \
             AND (expires_at IS NULL OR expires_at > $5) \
             AND ($2::TIMESTAMPTZ IS NULL OR (\"timestamp\", log_id) < ($2, $3)) \
             ORDER BY \"timestamp\" DESC, log_id DESC \
             LIMIT $4",
        )
        .bind(resource_id)
        .bind(after.map(|c| c.timestamp))
        .bind(after.map(|c| c.log_id.clone()))
        .bind(limit as i64)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list access log", e))
    }

    async fn find_range(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<AccessLogEntry>> {
        sqlx::query_as::<_, AccessLogEntry>(
            "SELECT * FROM access_logs \
             WHERE resource_id = $1 AND \"timestamp\" >= $2 AND \"timestamp\" <= $3 \
             AND (expires_at IS NULL OR expires_at > $5) \
             ORDER BY \"timestamp\" ASC, log_id ASC \
             LIMIT $4",
        )
        .bind(resource_id)
        .bind(start)
        .bind(end)
        .bind(limit as i64)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to export access log", e))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM access_logs WHERE expires_at IS NOT NULL AND expires_at <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to purge access log", e)
        })?;
        Ok(result.rows_affected())
    }
}
