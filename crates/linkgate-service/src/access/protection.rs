//! Creating and editing the protection of share links.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use linkgate_auth::ip::IpMatcher;
use linkgate_auth::password::PasswordHasher;
use linkgate_core::config::AccessConfig;
use linkgate_core::error::AppError;
use linkgate_core::result::AppResult;
use linkgate_core::traits::Clock;
use linkgate_database::Stores;
use linkgate_database::repositories::{IpRestrictionStore, PermissionStore, ResourceStore};
use linkgate_entity::audit::AccessAction;
use linkgate_entity::permission::{AccessPermission, IpRestriction, PasswordRecord};
use linkgate_entity::resource::ShareResource;

use crate::audit::AuditLogger;

/// Password settings for a new or changed share.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectionRecord {
    /// Whether recipients must present a password.
    pub is_password_protected: bool,
    /// Hex PBKDF2 key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    /// Hex salt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_salt: Option<String>,
}

impl ProtectionRecord {
    /// The stored form of this protection.
    pub fn password_record(&self) -> PasswordRecord {
        PasswordRecord::from_columns(self.password_hash.clone(), self.password_salt.clone())
    }
}

impl std::fmt::Debug for ProtectionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtectionRecord")
            .field("is_password_protected", &self.is_password_protected)
            .finish_non_exhaustive()
    }
}

/// Request to create a protected share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewShare {
    /// Resource (upload group) id.
    pub resource_id: String,
    /// User creating the share.
    pub owner_id: String,
    /// When the link stops working.
    pub expiration_date: DateTime<Utc>,
    /// Optional password.
    pub password: Option<String>,
    /// Intended recipients.
    #[serde(default)]
    pub allowed_emails: Vec<String>,
}

/// Replacement allow-list for a permission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpRestrictionUpdate {
    /// Whether the list is enforced.
    pub enabled: bool,
    /// Rules as submitted.
    pub allowed_rules: Vec<String>,
}

/// Outcome of an allow-list update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestrictionUpdateResult {
    /// Whether the list was stored.
    pub success: bool,
    /// The rules as stored.
    pub normalized_rules: Vec<String>,
}

/// Manages the protection settings of share links.
#[derive(Debug, Clone)]
pub struct ProtectionService {
    /// Share resources.
    resources: Arc<dyn ResourceStore>,
    /// Protection records.
    permissions: Arc<dyn PermissionStore>,
    /// IP allow-lists.
    ip_restrictions: Arc<dyn IpRestrictionStore>,
    /// Password hasher for new passwords.
    hasher: Arc<PasswordHasher>,
    /// Access log for setting changes.
    audit: Arc<AuditLogger>,
    /// Time source for timestamps.
    clock: Arc<dyn Clock>,
    /// Access policy.
    config: AccessConfig,
}

impl ProtectionService {
    /// Creates a new protection service.
    pub fn new(
        stores: &Stores,
        hasher: Arc<PasswordHasher>,
        audit: Arc<AuditLogger>,
        clock: Arc<dyn Clock>,
        config: AccessConfig,
    ) -> Self {
        Self {
            resources: Arc::clone(&stores.resources),
            permissions: Arc::clone(&stores.permissions),
            ip_restrictions: Arc::clone(&stores.ip_restrictions),
            hasher,
            audit,
            clock,
            config,
        }
    }

    /// Hash a share password, or describe an unprotected share when the
    /// password is missing or empty.
    pub fn create_protection(&self, password: Option<&str>) -> ProtectionRecord {
        match password.filter(|p| !p.is_empty()) {
            Some(password) => {
                let hashed = self.hasher.hash(password, None);
                ProtectionRecord {
                    is_password_protected: true,
                    password_hash: Some(hashed.hash),
                    password_salt: Some(hashed.salt),
                }
            }
            None => ProtectionRecord {
                is_password_protected: false,
                password_hash: None,
                password_salt: None,
            },
        }
    }

    /// Create a share resource and its permission.
    pub async fn create_share(&self, request: NewShare) -> AppResult<(ShareResource, AccessPermission)> {
        let resource_id = request.resource_id.trim();
        if resource_id.is_empty() {
            return Err(AppError::validation("Resource id must not be empty"));
        }
        let now = self.clock.now();
        if request.expiration_date <= now {
            return Err(AppError::validation("Expiration date must be in the future"));
        }

        let protection = self.create_protection(request.password.as_deref());
        let permission_id = Uuid::new_v4().to_string();

        let resource = self
            .resources
            .create(&ShareResource {
                id: resource_id.to_string(),
                owner_id: request.owner_id.clone(),
                created_at: now,
                expiration_date: request.expiration_date,
                is_password_protected: protection.is_password_protected,
                permission_id: permission_id.clone(),
            })
            .await?;

        let created = self
            .permissions
            .create(&AccessPermission {
                id: permission_id,
                resource_id: resource.id.clone(),
                expiration_date: request.expiration_date,
                password: protection.password_record(),
                allowed_emails: request.allowed_emails,
                created_by: request.owner_id,
                created_at: now,
                updated_at: now,
            })
            .await;
        let permission = match created {
            Ok(permission) => permission,
            Err(e) => {
                if let Err(cleanup) = self.resources.delete(&resource.id).await {
                    warn!(
                        resource_id = %resource.id,
                        error = %cleanup,
                        "Failed to remove resource after permission insert failed"
                    );
                }
                return Err(e);
            }
        };

        info!(
            resource_id = %resource.id,
            permission_id = %permission.id,
            protected = resource.is_password_protected,
            "Share created"
        );
        Ok((resource, permission))
    }

    /// Replace a permission's allow-list.
    ///
    /// Rules are trimmed and de-duplicated; malformed rules are dropped and
    /// the list is capped at the configured maximum.
    pub async fn update_ip_restriction(
        &self,
        permission_id: &str,
        update: IpRestrictionUpdate,
    ) -> AppResult<RestrictionUpdateResult> {
        let permission = self.require_permission(permission_id).await?;

        let normalized = IpMatcher::normalize(&update.allowed_rules, self.config.max_ip_rules);
        let stored = self
            .ip_restrictions
            .upsert(&IpRestriction {
                permission_id: permission_id.to_string(),
                enabled: update.enabled,
                allowed_rules: normalized.rules,
                updated_at: self.clock.now(),
            })
            .await?;

        info!(
            permission_id = %permission_id,
            enabled = stored.enabled,
            rules = stored.allowed_rules.len(),
            dropped = normalized.rejected.len(),
            truncated = normalized.truncated,
            "IP restriction updated"
        );
        self.record_update(
            &permission.resource_id,
            json!({
                "change": "ip_restriction",
                "enabled": stored.enabled,
                "ruleCount": stored.allowed_rules.len(),
            }),
        )
        .await;

        Ok(RestrictionUpdateResult {
            success: true,
            normalized_rules: stored.allowed_rules,
        })
    }

    /// The allow-list of a permission, if one was ever set.
    pub async fn get_ip_restriction(&self, permission_id: &str) -> AppResult<Option<IpRestriction>> {
        self.ip_restrictions.find(permission_id).await
    }

    /// Set, replace, or remove the password of a resource.
    ///
    /// `None` or an empty password removes protection. The resource flag is
    /// raised only after the password is stored and cleared before it is
    /// removed; if the second write fails the first is rolled back.
    pub async fn change_password(
        &self,
        resource_id: &str,
        password: Option<&str>,
    ) -> AppResult<ProtectionRecord> {
        let resource = self.require_resource(resource_id).await?;
        let permission = self.require_permission(&resource.permission_id).await?;
        let protection = self.create_protection(password);
        let record = protection.password_record();
        let now = self.clock.now();

        if protection.is_password_protected {
            self.write_password(&permission.id, &record, now).await?;
            if let Err(e) = self.write_protection_flag(resource_id, true).await {
                self.restore_password(&permission, &record, now).await;
                return Err(e);
            }
        } else {
            self.write_protection_flag(resource_id, false).await?;
            if let Err(e) = self.write_password(&permission.id, &record, now).await {
                self.restore_protection_flag(resource_id, resource.is_password_protected)
                    .await;
                return Err(e);
            }
        }

        info!(
            resource_id = %resource_id,
            protected = protection.is_password_protected,
            "Share password changed"
        );
        self.record_update(
            resource_id,
            json!({
                "change": "password",
                "protected": protection.is_password_protected,
            }),
        )
        .await;
        Ok(protection)
    }

    /// Move the expiration of a resource and its permission.
    pub async fn update_expiration(
        &self,
        resource_id: &str,
        expiration: DateTime<Utc>,
    ) -> AppResult<()> {
        let resource = self.require_resource(resource_id).await?;
        let now = self.clock.now();

        self.resources.update_expiration(resource_id, expiration).await?;
        self.permissions
            .update_expiration(&resource.permission_id, expiration, now)
            .await?;

        info!(resource_id = %resource_id, expiration = %expiration, "Share expiration updated");
        self.record_update(
            resource_id,
            json!({ "change": "expiration", "expirationDate": expiration }),
        )
        .await;
        Ok(())
    }

    /// Setting changes carry no requester address; they are logged with
    /// an unknown one.
    async fn record_update(&self, resource_id: &str, metadata: serde_json::Value) {
        self.audit
            .record(resource_id, None, None, "", AccessAction::Update, Some(metadata))
            .await;
    }

    async fn write_password(
        &self,
        permission_id: &str,
        record: &PasswordRecord,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if self.permissions.update_password(permission_id, record, now).await? {
            Ok(())
        } else {
            Err(AppError::not_found(format!("Permission '{permission_id}' not found")))
        }
    }

    async fn write_protection_flag(&self, resource_id: &str, protected: bool) -> AppResult<()> {
        if self.resources.update_protection(resource_id, protected).await? {
            Ok(())
        } else {
            Err(AppError::not_found(format!("Resource '{resource_id}' not found")))
        }
    }

    /// Put back the password `permission` held before `written` replaced it,
    /// unless someone else has changed it since.
    async fn restore_password(
        &self,
        permission: &AccessPermission,
        written: &PasswordRecord,
        now: DateTime<Utc>,
    ) {
        match self
            .permissions
            .replace_password(&permission.id, written, &permission.password, now)
            .await
        {
            Ok(true) => debug!(permission_id = %permission.id, "Rolled back password change"),
            Ok(false) => warn!(
                permission_id = %permission.id,
                "Password changed again before rollback, leaving it"
            ),
            Err(e) => error!(
                permission_id = %permission.id,
                error = %e,
                "Failed to roll back password change"
            ),
        }
    }

    async fn restore_protection_flag(&self, resource_id: &str, protected: bool) {
        if let Err(e) = self.write_protection_flag(resource_id, protected).await {
            error!(
                resource_id = %resource_id,
                error = %e,
                "Failed to roll back resource protection flag"
            );
        }
    }

    async fn require_resource(&self, resource_id: &str) -> AppResult<ShareResource> {
        self.resources
            .find_by_id(resource_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Resource '{resource_id}' not found")))
    }

    async fn require_permission(&self, permission_id: &str) -> AppResult<AccessPermission> {
        self.permissions
            .find_by_id(permission_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Permission '{permission_id}' not found")))
    }
}
