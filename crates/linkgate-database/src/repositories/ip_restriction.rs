//! IP restriction repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use linkgate_core::error::{AppError, ErrorKind};
use linkgate_core::result::AppResult;
use linkgate_entity::permission::IpRestriction;

use super::IpRestrictionStore;

/// PostgreSQL repository for IP restrictions.
#[derive(Debug, Clone)]
pub struct IpRestrictionRepository {
    pool: PgPool,
}

impl IpRestrictionRepository {
    /// Create a new IP restriction repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IpRestrictionStore for IpRestrictionRepository {
    async fn find(&self, permission_id: &str) -> AppResult<Option<IpRestriction>> {
        sqlx::query_as::<_, IpRestriction>(
            "SELECT * FROM ip_restrictions WHERE permission_id = $1",
        )
        .bind(permission_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find IP restriction", e)
        })
    }

    async fn upsert(&self, restriction: &IpRestriction) -> AppResult<IpRestriction> {
        sqlx::query_as::<_, IpRestriction>(
            "INSERT INTO ip_restrictions (permission_id, enabled, allowed_rules, updated_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (permission_id) DO UPDATE SET enabled = EXCLUDED.enabled, \
             allowed_rules = EXCLUDED.allowed_rules, updated_at = EXCLUDED.updated_at \
             RETURNING *",
        )
        .bind(&restriction.permission_id)
        .bind(restriction.enabled)
        .bind(&restriction.allowed_rules)
        .bind(restriction.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to save IP restriction", e)
        })
    }
}
