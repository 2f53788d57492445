//! Database migration runner.

use sqlx::PgPool;
use tracing::info;

use linkgate_core::error::{AppError, ErrorKind};

/// Apply the embedded schema migrations for the access-control tables.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to run migrations: {e}"),
                e,
            )
        })?;

    info!("Access-control schema is up to date");
    Ok(())
}
