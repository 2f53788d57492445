//! The share-link access decision.
//!
//! One verification walks a fixed sequence of checks and stops at the
//! first that denies:
//!
//! 1. lockout of the (resource, requester) pair
//! 2. IP allow-list of the resource's permission
//! 3. resource lookup
//! 4. unprotected resources are granted here
//! 5. permission lookup
//! 6. link expiry
//! 7. password
//!
//! Every decision is written to the access log afterwards.

use std::sync::Arc;

use serde_json::{Map, Value, json};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use linkgate_auth::ip::{AllowListCache, IpDecision};
use linkgate_auth::lockout::AttemptTracker;
use linkgate_auth::password::{HashedPassword, PasswordCheck, PasswordHasher};
use linkgate_core::error::{AppError, ErrorKind};
use linkgate_core::result::AppResult;
use linkgate_core::traits::Clock;
use linkgate_database::Stores;
use linkgate_database::repositories::{IpRestrictionStore, PermissionStore, ResourceStore};
use linkgate_entity::audit::AccessAction;
use linkgate_entity::permission::{AccessPermission, PasswordRecord};

use super::result::{ReasonCode, VerificationResult};
use crate::audit::AuditLogger;

/// A decision plus what the allow-list step saw, for the access log.
struct Outcome {
    result: VerificationResult,
    ip: Option<IpDecision>,
}

impl From<VerificationResult> for Outcome {
    fn from(result: VerificationResult) -> Self {
        Self { result, ip: None }
    }
}

/// Decides whether a requester may open a share link.
#[derive(Debug, Clone)]
pub struct AccessEvaluator {
    /// Share resources.
    resources: Arc<dyn ResourceStore>,
    /// Protection records.
    permissions: Arc<dyn PermissionStore>,
    /// IP allow-lists.
    ip_restrictions: Arc<dyn IpRestrictionStore>,
    /// Allow-lists already parsed, by permission id.
    allow_lists: Arc<AllowListCache>,
    /// Failure counting and lockout.
    tracker: Arc<AttemptTracker>,
    /// Password verification.
    hasher: Arc<PasswordHasher>,
    /// Access log.
    audit: Arc<AuditLogger>,
    /// Time source for expiry and lock checks.
    clock: Arc<dyn Clock>,
    /// In-flight legacy password upgrades.
    upgrades: TaskTracker,
}

impl AccessEvaluator {
    /// Creates a new access evaluator.
    pub fn new(
        stores: &Stores,
        tracker: Arc<AttemptTracker>,
        hasher: Arc<PasswordHasher>,
        audit: Arc<AuditLogger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            resources: Arc::clone(&stores.resources),
            permissions: Arc::clone(&stores.permissions),
            ip_restrictions: Arc::clone(&stores.ip_restrictions),
            allow_lists: Arc::new(AllowListCache::new()),
            tracker,
            hasher,
            audit,
            clock,
            upgrades: TaskTracker::new(),
        }
    }

    /// Verify a request for `resource_id` from `requester_ip`.
    ///
    /// Policy denials come back as `Ok` with `success == false`. `Err` means
    /// a store failed or a stored record could not be interpreted.
    pub async fn verify_access(
        &self,
        resource_id: &str,
        password: Option<&str>,
        requester_ip: &str,
    ) -> AppResult<VerificationResult> {
        let outcome = match self.evaluate(resource_id, password, requester_ip).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(resource_id = %resource_id, error = %e, "Access verification failed");
                return Err(e);
            }
        };

        self.audit
            .record(
                resource_id,
                None,
                None,
                requester_ip,
                AccessAction::Verify,
                Some(audit_metadata(&outcome)),
            )
            .await;

        Ok(outcome.result)
    }

    /// Wait for every scheduled legacy password upgrade to finish.
    pub async fn drain_upgrades(&self) {
        self.upgrades.close();
        self.upgrades.wait().await;
        self.upgrades.reopen();
    }

    async fn evaluate(
        &self,
        resource_id: &str,
        password: Option<&str>,
        requester_ip: &str,
    ) -> AppResult<Outcome> {
        // CHECK_LOCK
        let mut attempt = self.tracker.find(resource_id, requester_ip).await?;
        if let Some(record) = &attempt {
            if self.tracker.is_locked(record) {
                debug!(resource_id = %resource_id, "Request refused: requester is locked out");
                return Ok(VerificationResult::locked(record.lock_expiry).into());
            }
            if record.is_locked {
                debug!(resource_id = %resource_id, "Lock has lapsed, clearing attempt record");
                self.tracker.reset(resource_id, requester_ip).await;
                attempt = None;
            }
        }

        // CHECK_IP, resolved through the resource's permission.
        let resource = self.resources.find_by_id(resource_id).await?;
        let ip = match &resource {
            Some(res) => Some(self.check_ip(&res.permission_id, requester_ip).await),
            None => None,
        };
        if let Some(decision) = ip.as_ref().filter(|d| !d.is_allowed()) {
            debug!(resource_id = %resource_id, "Request refused by IP allow-list");
            return Ok(Outcome {
                result: VerificationResult::denied(ReasonCode::IpNotAllowed)
                    .with_remaining(self.tracker.threshold()),
                ip: Some(decision.clone()),
            });
        }

        // LOAD_RESOURCE
        let Some(resource) = resource else {
            return Ok(VerificationResult::denied(ReasonCode::ResourceNotFound).into());
        };

        if !resource.is_password_protected {
            info!(resource_id = %resource_id, "Access granted to unprotected resource");
            return Ok(Outcome {
                result: VerificationResult::granted(resource.summary()),
                ip,
            });
        }

        // LOAD_PERMISSION
        let Some(permission) = self.permissions.find_by_id(&resource.permission_id).await? else {
            return Ok(Outcome {
                result: VerificationResult::denied(ReasonCode::PermissionNotFound),
                ip,
            });
        };

        // CHECK_EXPIRY
        if permission.is_expired_at(self.clock.now()) {
            return Ok(Outcome {
                result: VerificationResult::denied(ReasonCode::Expired),
                ip,
            });
        }

        // CHECK_PASSWORD
        let Some(password) = password.filter(|p| !p.is_empty()) else {
            let remaining = self.tracker.remaining_attempts(attempt.as_ref());
            return Ok(Outcome {
                result: VerificationResult::denied(ReasonCode::PasswordRequired)
                    .with_remaining(remaining),
                ip,
            });
        };

        let result = match self.check_password(&permission, password).await? {
            PasswordCheck::Match => {
                self.tracker.reset(resource_id, requester_ip).await;
                info!(resource_id = %resource_id, "Access granted");
                VerificationResult::granted(resource.summary())
            }
            PasswordCheck::LegacyMatch(replacement) => {
                self.tracker.reset(resource_id, requester_ip).await;
                self.schedule_upgrade(&permission, replacement);
                info!(resource_id = %resource_id, "Access granted with legacy password");
                VerificationResult::granted(resource.summary())
            }
            PasswordCheck::Mismatch => {
                let record = self.tracker.record_failure(resource_id, requester_ip).await?;
                let denied = VerificationResult::denied(ReasonCode::InvalidPassword)
                    .with_remaining(record.remaining_attempts(self.tracker.threshold()));
                if record.is_locked {
                    denied.with_lock(record.lock_expiry)
                } else {
                    denied
                }
            }
            PasswordCheck::NotConfigured => return Err(missing_password(&permission)),
        };

        Ok(Outcome { result, ip })
    }

    async fn check_ip(&self, permission_id: &str, requester_ip: &str) -> IpDecision {
        match self.ip_restrictions.find(permission_id).await {
            Ok(restriction) => self.allow_lists.evaluate(requester_ip, restriction.as_ref()),
            // Intentional trade-off: an allow-list that cannot be loaded lets
            // the request through. The lockout and password checks that
            // follow still fail closed.
            Err(e) => {
                warn!(
                    permission_id = %permission_id,
                    error = %e,
                    "IP restriction unavailable, allowing request (fail-open)"
                );
                IpDecision::FailedOpen {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn check_password(
        &self,
        permission: &AccessPermission,
        password: &str,
    ) -> AppResult<PasswordCheck> {
        if !permission.password.is_protected() {
            return Err(missing_password(permission));
        }

        let hasher = Arc::clone(&self.hasher);
        let candidate = password.to_string();
        let stored = permission.password.clone();
        tokio::task::spawn_blocking(move || hasher.check(&candidate, &stored))
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Internal, "Password check task failed", e))
    }

    /// Rewrite a legacy password as a salted hash in the background.
    ///
    /// The caller already has its answer; a failed rewrite is only logged
    /// and the legacy record keeps working. The rewrite only lands while the
    /// permission still holds the legacy value that was checked.
    fn schedule_upgrade(&self, permission: &AccessPermission, replacement: HashedPassword) {
        let permissions = Arc::clone(&self.permissions);
        let permission_id = permission.id.clone();
        let expected = permission.password.clone();
        let now = self.clock.now();
        self.upgrades.spawn(async move {
            let record = PasswordRecord::from(replacement);
            match permissions
                .replace_password(&permission_id, &expected, &record, now)
                .await
            {
                Ok(true) => info!(permission_id = %permission_id, "Upgraded legacy password"),
                Ok(false) => warn!(
                    permission_id = %permission_id,
                    "Permission changed or disappeared before legacy password upgrade"
                ),
                Err(e) => warn!(
                    permission_id = %permission_id,
                    error = %e,
                    "Legacy password upgrade failed"
                ),
            }
        });
    }
}

fn missing_password(permission: &AccessPermission) -> AppError {
    AppError::malformed_record(format!(
        "Resource '{}' is password protected but permission '{}' has no password",
        permission.resource_id, permission.id
    ))
}

fn audit_metadata(outcome: &Outcome) -> Value {
    let result = &outcome.result;
    let mut meta = Map::new();
    meta.insert("success".into(), json!(result.success));
    meta.insert("reasonCode".into(), json!(result.reason_code));
    if let Some(remaining) = result.remaining_attempts {
        meta.insert("remainingAttempts".into(), json!(remaining));
    }
    if let Some(locked) = result.is_locked {
        meta.insert("isLocked".into(), json!(locked));
    }
    if let Some(decision) = &outcome.ip {
        meta.insert("ipCheck".into(), json!(decision.as_str()));
    }
    Value::Object(meta)
}
