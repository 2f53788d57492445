//! In-memory resource, permission, and IP restriction stores.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use linkgate_core::error::AppError;
use linkgate_core::result::AppResult;
use linkgate_entity::permission::{AccessPermission, IpRestriction, PasswordRecord};
use linkgate_entity::resource::ShareResource;

use crate::repositories::{IpRestrictionStore, PermissionStore, ResourceStore};

/// In-memory share resource store.
#[derive(Debug, Clone, Default)]
pub struct MemoryResourceStore {
    records: Arc<DashMap<String, ShareResource>>,
}

impl MemoryResourceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceStore for MemoryResourceStore {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<ShareResource>> {
        Ok(self.records.get(id).map(|r| r.value().clone()))
    }

    async fn create(&self, resource: &ShareResource) -> AppResult<ShareResource> {
        match self.records.entry(resource.id.clone()) {
            Entry::Occupied(_) => Err(AppError::conflict(format!(
                "Resource '{}' already exists",
                resource.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(resource.clone());
                Ok(resource.clone())
            }
        }
    }

    async fn update_expiration(&self, id: &str, expiration: DateTime<Utc>) -> AppResult<bool> {
        match self.records.get_mut(id) {
            Some(mut record) => {
                record.expiration_date = expiration;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_protection(&self, id: &str, is_password_protected: bool) -> AppResult<bool> {
        match self.records.get_mut(id) {
            Some(mut record) => {
                record.is_password_protected = is_password_protected;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        Ok(self.records.remove(id).is_some())
    }
}

/// In-memory access permission store.
#[derive(Debug, Clone, Default)]
pub struct MemoryPermissionStore {
    records: Arc<DashMap<String, AccessPermission>>,
}

impl MemoryPermissionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionStore for MemoryPermissionStore {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<AccessPermission>> {
        Ok(self.records.get(id).map(|r| r.value().clone()))
    }

    async fn create(&self, permission: &AccessPermission) -> AppResult<AccessPermission> {
        match self.records.entry(permission.id.clone()) {
            Entry::Occupied(_) => Err(AppError::conflict(format!(
                "Permission '{}' already exists",
                permission.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(permission.clone());
                Ok(permission.clone())
            }
        }
    }

    async fn update_password(
        &self,
        id: &str,
        password: &PasswordRecord,
        updated_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        match self.records.get_mut(id) {
            Some(mut record) => {
                record.password = password.clone();
                record.updated_at = updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn replace_password(
        &self,
        id: &str,
        expected: &PasswordRecord,
        password: &PasswordRecord,
        updated_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        match self.records.get_mut(id) {
            Some(mut record) if record.password == *expected => {
                record.password = password.clone();
                record.updated_at = updated_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_expiration(
        &self,
        id: &str,
        expiration: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        match self.records.get_mut(id) {
            Some(mut record) => {
                record.expiration_date = expiration;
                record.updated_at = updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// In-memory IP restriction store.
#[derive(Debug, Clone, Default)]
pub struct MemoryIpRestrictionStore {
    records: Arc<DashMap<String, IpRestriction>>,
}

impl MemoryIpRestrictionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IpRestrictionStore for MemoryIpRestrictionStore {
    async fn find(&self, permission_id: &str) -> AppResult<Option<IpRestriction>> {
        Ok(self.records.get(permission_id).map(|r| r.value().clone()))
    }

    async fn upsert(&self, restriction: &IpRestriction) -> AppResult<IpRestriction> {
        self.records
            .insert(restriction.permission_id.clone(), restriction.clone());
        Ok(restriction.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn permission(id: &str) -> AccessPermission {
        let now = Utc::now();
        AccessPermission {
            id: id.to_string(),
            resource_id: "r1".to_string(),
            expiration_date: now + Duration::days(5),
            password: PasswordRecord::Legacy {
                encoded: "c2VjcmV0".to_string(),
            },
            allowed_emails: vec!["a@example.com".to_string()],
            created_by: "owner".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_permission_password_rewrite() {
        let store = MemoryPermissionStore::new();
        store.create(&permission("p1")).await.unwrap();

        let salted = PasswordRecord::Salted {
            hash: "ab".to_string(),
            salt: "cd".to_string(),
        };
        assert!(store.update_password("p1", &salted, Utc::now()).await.unwrap());
        assert!(!store.update_password("missing", &salted, Utc::now()).await.unwrap());

        let stored = store.find_by_id("p1").await.unwrap().unwrap();
        assert_eq!(stored.password, salted);
    }

    #[tokio::test]
    async fn test_replace_password_requires_expected_record() {
        let store = MemoryPermissionStore::new();
        let original = store.create(&permission("p1")).await.unwrap();

        let changed = PasswordRecord::Salted {
            hash: "11".to_string(),
            salt: "22".to_string(),
        };
        store.update_password("p1", &changed, Utc::now()).await.unwrap();

        let upgrade = PasswordRecord::Salted {
            hash: "33".to_string(),
            salt: "44".to_string(),
        };
        assert!(!store
            .replace_password("p1", &original.password, &upgrade, Utc::now())
            .await
            .unwrap());
        assert_eq!(store.find_by_id("p1").await.unwrap().unwrap().password, changed);

        assert!(store
            .replace_password("p1", &changed, &upgrade, Utc::now())
            .await
            .unwrap());
        assert_eq!(store.find_by_id("p1").await.unwrap().unwrap().password, upgrade);
        assert!(!store
            .replace_password("missing", &changed, &upgrade, Utc::now())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts() {
        let store = MemoryPermissionStore::new();
        store.create(&permission("p1")).await.unwrap();
        let err = store.create(&permission("p1")).await.unwrap_err();
        assert_eq!(err.kind, linkgate_core::error::ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_ip_restriction_replaced_wholesale() {
        let store = MemoryIpRestrictionStore::new();
        let first = IpRestriction {
            permission_id: "p1".to_string(),
            enabled: true,
            allowed_rules: vec!["10.0.0.0/8".to_string(), "1.2.3.4".to_string()],
            updated_at: Utc::now(),
        };
        store.upsert(&first).await.unwrap();

        let second = IpRestriction {
            allowed_rules: vec!["192.168.*.*".to_string()],
            ..first.clone()
        };
        store.upsert(&second).await.unwrap();

        let stored = store.find("p1").await.unwrap().unwrap();
        assert_eq!(stored.allowed_rules, vec!["192.168.*.*".to_string()]);
    }
}
