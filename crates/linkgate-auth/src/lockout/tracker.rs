//! Failed-attempt tracking with time-boxed lockout.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use linkgate_cache::keys;
use linkgate_core::config::AccessConfig;
use linkgate_core::error::AppError;
use linkgate_core::result::AppResult;
use linkgate_core::traits::{Clock, KeyValueStore, Versioned};
use linkgate_entity::attempt::{AccessAttempt, AttemptKey};

/// Whether `record` holds a lock that is still in force at `now`.
pub fn is_currently_locked(record: &AccessAttempt, now: DateTime<Utc>) -> bool {
    record.is_currently_locked(now)
}

/// Counts failed password attempts per (resource, requester) and locks the
/// pair out once the threshold is reached.
///
/// Records live in a [`KeyValueStore`] and are updated with
/// compare-and-swap, so concurrent failures for the same pair are never
/// lost to a read-modify-write race.
#[derive(Debug, Clone)]
pub struct AttemptTracker {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    threshold: u32,
    lock_duration: chrono::Duration,
    record_ttl: Duration,
    max_retries: u32,
}

impl AttemptTracker {
    /// Creates a new tracker.
    ///
    /// `record_ttl` bounds how long an idle record is kept. It is raised
    /// to the lock duration when shorter so a lock is never evicted early.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: &AccessConfig,
        record_ttl: Duration,
    ) -> Self {
        let lock_duration = config.lockout_duration();
        let lock_std = lock_duration.to_std().unwrap_or_default();
        Self {
            store,
            clock,
            threshold: config.lockout_threshold,
            lock_duration,
            record_ttl: record_ttl.max(lock_std),
            max_retries: config.attempt_cas_retries.max(1),
        }
    }

    /// Failures allowed before lockout.
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Attempts left for a pair, given its record if any.
    pub fn remaining_attempts(&self, record: Option<&AccessAttempt>) -> u32 {
        match record {
            Some(r) if !r.has_lapsed_lock(self.clock.now()) => r.remaining_attempts(self.threshold),
            _ => self.threshold,
        }
    }

    /// Whether `record` is locked right now.
    pub fn is_locked(&self, record: &AccessAttempt) -> bool {
        is_currently_locked(record, self.clock.now())
    }

    /// Load the attempt record of a pair.
    pub async fn find(&self, resource_id: &str, requester_ip: &str) -> AppResult<Option<AccessAttempt>> {
        let key = keys::access_attempt(resource_id, requester_ip);
        Ok(self.load(&key).await?.map(|v| v.value))
    }

    /// Count one failed attempt and return the updated record.
    ///
    /// A lapsed lock starts a new count. Fails with a conflict error if
    /// the record keeps changing underneath for every retry.
    pub async fn record_failure(&self, resource_id: &str, requester_ip: &str) -> AppResult<AccessAttempt> {
        let attempt_key = AttemptKey::new(resource_id, requester_ip);
        let key = keys::access_attempt(resource_id, requester_ip);

        for retry in 0..self.max_retries {
            let current = self.load(&key).await?;
            let now = self.clock.now();
            let previous = current.as_ref().map(|v| &v.value);
            let next = AccessAttempt::with_failure(
                previous,
                &attempt_key,
                now,
                self.threshold,
                self.lock_duration,
            );

            let payload = serde_json::to_string(&next)?;
            let expected = current.as_ref().map(|v| v.version);
            if self
                .store
                .compare_and_swap(&key, expected, &payload, self.record_ttl)
                .await?
            {
                let newly_locked = next.is_locked && !previous.is_some_and(|p| p.is_currently_locked(now));
                if newly_locked {
                    info!(
                        resource_id = %resource_id,
                        attempts = next.attempt_count,
                        lock_expiry = ?next.lock_expiry,
                        "Requester locked out after repeated failures"
                    );
                } else {
                    debug!(
                        resource_id = %resource_id,
                        attempts = next.attempt_count,
                        "Recorded failed attempt"
                    );
                }
                return Ok(next);
            }

            debug!(key = %attempt_key, retry, "Attempt record changed concurrently, retrying");
        }

        Err(AppError::conflict(format!(
            "Attempt record for {attempt_key} kept changing; gave up after {} retries",
            self.max_retries
        )))
    }

    /// Forget a pair's failures.
    ///
    /// Errors are logged and swallowed: a failed reset must never turn a
    /// granted request into an error.
    pub async fn reset(&self, resource_id: &str, requester_ip: &str) {
        let key = keys::access_attempt(resource_id, requester_ip);
        if let Err(e) = self.store.delete(&key).await {
            warn!(resource_id = %resource_id, error = %e, "Failed to reset attempt record");
        }
    }

    async fn load(&self, key: &str) -> AppResult<Option<Versioned<AccessAttempt>>> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        let value: AccessAttempt = serde_json::from_str(&raw.value).map_err(|e| {
            AppError::malformed_record(format!("Attempt record '{key}' is not valid: {e}"))
        })?;
        Ok(Some(Versioned {
            value,
            version: raw.version,
        }))
    }
}
