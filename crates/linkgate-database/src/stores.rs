//! Store selection from configuration.

use std::sync::Arc;

use tracing::info;

use linkgate_core::config::DatabaseConfig;
use linkgate_core::error::AppError;
use linkgate_core::result::AppResult;

use crate::connection::DatabasePool;
use crate::repositories::{
    AccessLogRepository, AccessLogStore, IpRestrictionRepository, IpRestrictionStore,
    PermissionRepository, PermissionStore, ResourceRepository, ResourceStore,
};

/// The record stores the access services are built from.
#[derive(Debug, Clone)]
pub struct Stores {
    /// Share resources.
    pub resources: Arc<dyn ResourceStore>,
    /// Protection records.
    pub permissions: Arc<dyn PermissionStore>,
    /// IP allow-lists.
    pub ip_restrictions: Arc<dyn IpRestrictionStore>,
    /// Access log.
    pub access_logs: Arc<dyn AccessLogStore>,
}

impl Stores {
    /// Build the stores named by `config.backend`.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        match config.backend.as_str() {
            "postgres" => {
                let pool = DatabasePool::connect(config).await?;
                info!("Using PostgreSQL record stores");
                Ok(Self::postgres(pool))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Using in-memory record stores");
                Ok(Self::memory())
            }
            other => Err(AppError::configuration(format!(
                "Unknown database backend: '{other}'"
            ))),
        }
    }

    /// Stores backed by PostgreSQL.
    pub fn postgres(pool: DatabasePool) -> Self {
        let pool = pool.into_pool();
        Self {
            resources: Arc::new(ResourceRepository::new(pool.clone())),
            permissions: Arc::new(PermissionRepository::new(pool.clone())),
            ip_restrictions: Arc::new(IpRestrictionRepository::new(pool.clone())),
            access_logs: Arc::new(AccessLogRepository::new(pool)),
        }
    }

    /// Fresh, empty in-memory stores.
    #[cfg(feature = "memory")]
    pub fn memory() -> Self {
        use crate::memory::{
            MemoryAccessLogStore, MemoryIpRestrictionStore, MemoryPermissionStore,
            MemoryResourceStore,
        };

        Self {
            resources: Arc::new(MemoryResourceStore::new()),
            permissions: Arc::new(MemoryPermissionStore::new()),
            ip_restrictions: Arc::new(MemoryIpRestrictionStore::new()),
            access_logs: Arc::new(MemoryAccessLogStore::new()),
        }
    }
}
