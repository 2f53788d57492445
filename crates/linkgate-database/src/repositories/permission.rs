//! Access permission repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use linkgate_core::error::{AppError, ErrorKind};
use linkgate_core::result::AppResult;
use linkgate_entity::permission::{AccessPermission, PasswordRecord};

use super::PermissionStore;

/// Row shape of `access_permissions`; the password columns are folded
/// into a [`PasswordRecord`] on the way out.
#[derive(Debug, FromRow)]
struct PermissionRow {
    id: String,
    resource_id: String,
    expiration_date: DateTime<Utc>,
    password_hash: Option<String>,
    password_salt: Option<String>,
    allowed_emails: Vec<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PermissionRow> for AccessPermission {
    fn from(row: PermissionRow) -> Self {
        Self {
            id: row.id,
            resource_id: row.resource_id,
            expiration_date: row.expiration_date,
            password: PasswordRecord::from_columns(row.password_hash, row.password_salt),
            allowed_emails: row.allowed_emails,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL repository for access permissions.
#[derive(Debug, Clone)]
pub struct PermissionRepository {
    pool: PgPool,
}

impl PermissionRepository {
    /// Create a new permission repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionStore for PermissionRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<AccessPermission>> {
        let row = sqlx::query_as::<_, PermissionRow>(
            "SELECT * FROM access_permissions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find permission", e))?;
        Ok(row.map(AccessPermission::from))
    }

    async fn create(&self, permission: &AccessPermission) -> AppResult<AccessPermission> {
        let (hash, salt) = permission.password.to_columns();
        let row = sqlx::query_as::<_, PermissionRow>(
            "INSERT INTO access_permissions (id, resource_id, expiration_date, password_hash, \
             password_salt, allowed_emails, created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
        )
        .bind(&permission.id)
        .bind(&permission.resource_id)
        .bind(permission.expiration_date)
        .bind(hash)
        .bind(salt)
        .bind(&permission.allowed_emails)
        .bind(&permission.created_by)
        .bind(permission.created_at)
        .bind(permission.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to create permission", e)
        })?;
        Ok(row.into())
    }

    async fn update_password(
        &self,
        id: &str,
        password: &PasswordRecord,
        updated_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let (hash, salt) = password.to_columns();
        let result = sqlx::query(
            "UPDATE access_permissions SET password_hash = $2, password_salt = $3, \
             updated_at = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(hash)
        .bind(salt)
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update permission password", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn replace_password(
        &self,
        id: &str,
        expected: &PasswordRecord,
        password: &PasswordRecord,
        updated_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let (old_hash, old_salt) = expected.to_columns();
        let (hash, salt) = password.to_columns();
        let result = sqlx::query(
            "UPDATE access_permissions SET password_hash = $2, password_salt = $3, \
             updated_at = $4 WHERE id = $1 AND password_hash IS NOT DISTINCT FROM $5 \
             AND password_salt IS NOT DISTINCT FROM $6",
        )
        .bind(id)
        .bind(hash)
        .bind(salt)
        .bind(updated_at)
        .bind(old_hash)
        .bind(old_salt)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to replace permission password", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_expiration(
        &self,
        id: &str,
        expiration: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE access_permissions SET expiration_date = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(expiration)
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                "Failed to update permission expiration",
                e,
            )
        })?;
        Ok(result.rows_affected() > 0)
    }
}
