//! Share resource repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use linkgate_core::error::{AppError, ErrorKind};
use linkgate_core::result::AppResult;
use linkgate_entity::resource::ShareResource;

use super::ResourceStore;

/// PostgreSQL repository for share resources.
#[derive(Debug, Clone)]
pub struct ResourceRepository {
    pool: PgPool,
}

impl ResourceRepository {
    /// Create a new resource repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResourceStore for ResourceRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<ShareResource>> {
        sqlx::query_as::<_, ShareResource>("SELECT * FROM share_resources WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find resource", e))
    }

    async fn create(&self, resource: &ShareResource) -> AppResult<ShareResource> {
        sqlx::query_as::<_, ShareResource>(
            "INSERT INTO share_resources (id, owner_id, created_at, expiration_date, \
             is_password_protected, permission_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(&resource.id)
        .bind(&resource.owner_id)
        .bind(resource.created_at)
        .bind(resource.expiration_date)
        .bind(resource.is_password_protected)
        .bind(&resource.permission_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create resource", e))
    }

    async fn update_expiration(&self, id: &str, expiration: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query("UPDATE share_resources SET expiration_date = $2 WHERE id = $1")
            .bind(id)
            .bind(expiration)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    "Failed to update resource expiration",
                    e,
                )
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_protection(&self, id: &str, is_password_protected: bool) -> AppResult<bool> {
        let result =
            sqlx::query("UPDATE share_resources SET is_password_protected = $2 WHERE id = $1")
                .bind(id)
                .bind(is_password_protected)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Database,
                        "Failed to update resource protection",
                        e,
                    )
                })?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM share_resources WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete resource", e))?;
        Ok(result.rows_affected() > 0)
    }
}
