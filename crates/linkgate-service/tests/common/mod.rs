//! Shared setup for the access-layer integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};

use linkgate_cache::KvStoreManager;
use linkgate_cache::memory::MemoryKvStore;
use linkgate_core::config::AppConfig;
use linkgate_core::traits::{KeyValueStore, ManualClock};
use linkgate_database::Stores;
use linkgate_entity::permission::{AccessPermission, PasswordRecord};
use linkgate_entity::resource::ShareResource;
use linkgate_service::AppServices;
use linkgate_service::access::NewShare;

pub const CLIENT_IP: &str = "1.2.3.4";

/// Fixed starting instant for every test clock.
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

/// Services over in-memory stores and a manual clock.
pub struct Harness {
    pub services: AppServices,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(Stores::memory(), Arc::new(MemoryKvStore::new()))
    }

    pub fn with(stores: Stores, attempts: Arc<dyn KeyValueStore>) -> Self {
        let clock = ManualClock::new(start());
        let attempts = KvStoreManager::from_store(attempts, StdDuration::from_secs(24 * 3600));
        let services = AppServices::build(
            &AppConfig::default(),
            stores,
            attempts,
            Arc::new(clock.clone()),
        );
        Self { services, clock }
    }

    /// A share expiring five days after [`start`].
    pub async fn share(&self, id: &str, password: Option<&str>) -> (ShareResource, AccessPermission) {
        self.services
            .protection
            .create_share(NewShare {
                resource_id: id.to_string(),
                owner_id: "owner-1".to_string(),
                expiration_date: start() + Duration::days(5),
                password: password.map(String::from),
                allowed_emails: vec!["recipient@example.com".to_string()],
            })
            .await
            .unwrap()
    }

    /// A protected share whose permission stores `password` directly.
    pub async fn share_with_record(&self, id: &str, password: PasswordRecord) -> AccessPermission {
        let (_, permission) = self.share(id, Some("placeholder")).await;
        self.services
            .stores
            .permissions
            .update_password(&permission.id, &password, start())
            .await
            .unwrap();
        self.permission(&permission.id).await
    }

    pub async fn permission(&self, id: &str) -> AccessPermission {
        self.services
            .stores
            .permissions
            .find_by_id(id)
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn verify(&self, id: &str, password: Option<&str>) -> linkgate_service::VerificationResult {
        self.verify_from(id, password, CLIENT_IP).await
    }

    pub async fn verify_from(
        &self,
        id: &str,
        password: Option<&str>,
        ip: &str,
    ) -> linkgate_service::VerificationResult {
        self.services
            .evaluator
            .verify_access(id, password, ip)
            .await
            .unwrap()
    }
}
