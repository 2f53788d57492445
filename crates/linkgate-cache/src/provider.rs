//! Store manager that dispatches to the configured backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use linkgate_core::config::AttemptStoreConfig;
use linkgate_core::error::AppError;
use linkgate_core::result::AppResult;
use linkgate_core::traits::kv::{KeyValueStore, Versioned};

/// Key-value store manager that wraps the configured backend.
///
/// The backend is selected at construction time based on configuration.
#[derive(Debug, Clone)]
pub struct KvStoreManager {
    inner: Arc<dyn KeyValueStore>,
    record_ttl: Duration,
}

impl KvStoreManager {
    /// Create a new store manager from configuration.
    pub async fn new(config: &AttemptStoreConfig) -> AppResult<Self> {
        let inner: Arc<dyn KeyValueStore> = match config.backend.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis attempt store");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                Arc::new(crate::redis::RedisKvStore::new(client))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory attempt store");
                Arc::new(crate::memory::MemoryKvStore::new())
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown attempt store backend: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self {
            inner,
            record_ttl: Duration::from_secs(config.record_ttl_hours.saturating_mul(3600)),
        })
    }

    /// Create a manager from an existing store (for testing).
    pub fn from_store(store: Arc<dyn KeyValueStore>, record_ttl: Duration) -> Self {
        Self {
            inner: store,
            record_ttl,
        }
    }

    /// How long idle records are retained.
    pub fn record_ttl(&self) -> Duration {
        self.record_ttl
    }
}

#[async_trait]
impl KeyValueStore for KvStoreManager {
    async fn get(&self, key: &str) -> AppResult<Option<Versioned<String>>> {
        self.inner.get(key).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: &str,
        ttl: Duration,
    ) -> AppResult<bool> {
        self.inner
            .compare_and_swap(key, expected_version, value, ttl)
            .await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.inner.delete(key).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}
