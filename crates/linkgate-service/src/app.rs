//! Wiring of the access services from configuration.

use std::sync::Arc;

use tracing::info;

use linkgate_auth::lockout::AttemptTracker;
use linkgate_auth::password::PasswordHasher;
use linkgate_cache::KvStoreManager;
use linkgate_core::config::AppConfig;
use linkgate_core::result::AppResult;
use linkgate_core::traits::{Clock, SystemClock};
use linkgate_database::Stores;

use crate::access::{AccessEvaluator, ProtectionService};
use crate::audit::AuditLogger;

/// Every service of the access layer, built over one set of stores.
#[derive(Debug, Clone)]
pub struct AppServices {
    /// Record stores.
    pub stores: Stores,
    /// Attempt counting.
    pub tracker: Arc<AttemptTracker>,
    /// Access log.
    pub audit: Arc<AuditLogger>,
    /// Access decisions.
    pub evaluator: Arc<AccessEvaluator>,
    /// Protection management.
    pub protection: Arc<ProtectionService>,
}

impl AppServices {
    /// Connect the configured stores and build the services on the system
    /// clock.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        let stores = Stores::connect(&config.database).await?;
        let attempts = KvStoreManager::new(&config.attempts).await?;
        info!(
            database = %config.database.backend,
            attempts = %config.attempts.backend,
            "Access services ready"
        );
        Ok(Self::build(config, stores, attempts, Arc::new(SystemClock)))
    }

    /// Build the services over existing stores.
    pub fn build(
        config: &AppConfig,
        stores: Stores,
        attempts: KvStoreManager,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let record_ttl = attempts.record_ttl();
        let tracker = Arc::new(AttemptTracker::new(
            Arc::new(attempts),
            Arc::clone(&clock),
            &config.access,
            record_ttl,
        ));
        let hasher = Arc::new(PasswordHasher::from_config(&config.access));
        let audit = Arc::new(AuditLogger::new(
            Arc::clone(&stores.access_logs),
            Arc::clone(&clock),
            config.audit.clone(),
        ));
        let evaluator = Arc::new(AccessEvaluator::new(
            &stores,
            Arc::clone(&tracker),
            Arc::clone(&hasher),
            Arc::clone(&audit),
            Arc::clone(&clock),
        ));
        let protection = Arc::new(ProtectionService::new(
            &stores,
            hasher,
            Arc::clone(&audit),
            clock,
            config.access.clone(),
        ));

        Self {
            stores,
            tracker,
            audit,
            evaluator,
            protection,
        }
    }
}
