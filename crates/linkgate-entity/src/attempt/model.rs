//! Access attempt entity model.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Identifies the throttling bucket of one requester against one resource.
///
/// Rendered as `resourceId:requesterIp`, the key format shared with
/// existing attempt stores.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttemptKey {
    /// The resource being unlocked.
    pub resource_id: String,
    /// The requester address as seen by the request layer.
    pub requester_ip: String,
}

impl AttemptKey {
    /// Create a key.
    pub fn new(resource_id: impl Into<String>, requester_ip: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            requester_ip: requester_ip.into(),
        }
    }
}

impl fmt::Display for AttemptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_id, self.requester_ip)
    }
}

/// Failed password attempts for one [`AttemptKey`].
///
/// Field names follow the camelCase attribute names of the shared
/// attempt table so records stay readable by every reader of that table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessAttempt {
    /// The resource being unlocked.
    pub resource_id: String,
    /// The requester address.
    pub requester_ip: String,
    /// Consecutive failures since the last reset.
    pub attempt_count: u32,
    /// Time of the first failure in this run.
    pub first_attempt: DateTime<Utc>,
    /// Time of the most recent failure.
    pub last_attempt: DateTime<Utc>,
    /// Set once `attempt_count` reaches the lockout threshold.
    pub is_locked: bool,
    /// When the lock lifts.
    pub lock_expiry: Option<DateTime<Utc>>,
}

impl AccessAttempt {
    /// A record for the first failure of a run.
    pub fn first_failure(key: &AttemptKey, now: DateTime<Utc>) -> Self {
        Self {
            resource_id: key.resource_id.clone(),
            requester_ip: key.requester_ip.clone(),
            attempt_count: 0,
            first_attempt: now,
            last_attempt: now,
            is_locked: false,
            lock_expiry: None,
        }
    }

    /// Whether the lock is in force at `now`.
    ///
    /// At or after `lock_expiry` the lock has lapsed. A locked record
    /// without an expiry is treated as lapsed rather than permanent.
    pub fn is_currently_locked(&self, now: DateTime<Utc>) -> bool {
        match (self.is_locked, self.lock_expiry) {
            (true, Some(expiry)) => now < expiry,
            _ => false,
        }
    }

    /// Whether the record carries a lock that is no longer in force.
    pub fn has_lapsed_lock(&self, now: DateTime<Utc>) -> bool {
        self.is_locked && !self.is_currently_locked(now)
    }

    /// Attempts left before the lock trips.
    pub fn remaining_attempts(&self, threshold: u32) -> u32 {
        threshold.saturating_sub(self.attempt_count)
    }

    /// The record after one more failure at `now`.
    ///
    /// A lapsed lock starts a fresh run. Locking happens once, on the
    /// failure that reaches `threshold`; later failures inside the lock
    /// window do not extend it.
    pub fn with_failure(
        previous: Option<&Self>,
        key: &AttemptKey,
        now: DateTime<Utc>,
        threshold: u32,
        lock_duration: Duration,
    ) -> Self {
        let mut next = match previous {
            Some(prev) if !prev.has_lapsed_lock(now) => prev.clone(),
            _ => Self::first_failure(key, now),
        };

        next.attempt_count = next.attempt_count.saturating_add(1);
        next.last_attempt = now;

        if next.attempt_count >= threshold && !next.is_locked {
            next.is_locked = true;
            next.lock_expiry = Some(now + lock_duration);
        }

        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> AttemptKey {
        AttemptKey::new("R1", "1.2.3.4")
    }

    #[test]
    fn test_key_format() {
        assert_eq!(key().to_string(), "R1:1.2.3.4");
    }

    #[test]
    fn test_fifth_failure_locks_for_thirty_minutes() {
        let start = Utc::now();
        let mut record: Option<AccessAttempt> = None;
        for i in 0..5 {
            let now = start + Duration::seconds(i);
            record = Some(AccessAttempt::with_failure(
                record.as_ref(),
                &key(),
                now,
                5,
                Duration::minutes(30),
            ));
        }
        let record = record.unwrap();
        assert_eq!(record.attempt_count, 5);
        assert!(record.is_locked);
        assert_eq!(
            record.lock_expiry,
            Some(start + Duration::seconds(4) + Duration::minutes(30))
        );
        assert_eq!(record.first_attempt, start);
    }

    #[test]
    fn test_failure_inside_lock_does_not_extend_it() {
        let now = Utc::now();
        let mut record = AccessAttempt::first_failure(&key(), now);
        record.attempt_count = 5;
        record.is_locked = true;
        record.lock_expiry = Some(now + Duration::minutes(30));

        let next = AccessAttempt::with_failure(
            Some(&record),
            &key(),
            now + Duration::minutes(1),
            5,
            Duration::minutes(30),
        );
        assert_eq!(next.attempt_count, 6);
        assert_eq!(next.lock_expiry, record.lock_expiry);
    }

    #[test]
    fn test_lock_lapses_exactly_at_expiry() {
        let now = Utc::now();
        let mut record = AccessAttempt::first_failure(&key(), now);
        record.is_locked = true;
        record.lock_expiry = Some(now + Duration::minutes(30));

        assert!(record.is_currently_locked(now + Duration::minutes(29)));
        assert!(!record.is_currently_locked(now + Duration::minutes(30)));
        assert!(record.has_lapsed_lock(now + Duration::minutes(30)));
    }

    #[test]
    fn test_lapsed_lock_restarts_count() {
        let now = Utc::now();
        let mut record = AccessAttempt::first_failure(&key(), now);
        record.attempt_count = 5;
        record.is_locked = true;
        record.lock_expiry = Some(now + Duration::minutes(30));

        let later = now + Duration::minutes(31);
        let next =
            AccessAttempt::with_failure(Some(&record), &key(), later, 5, Duration::minutes(30));
        assert_eq!(next.attempt_count, 1);
        assert!(!next.is_locked);
        assert_eq!(next.first_attempt, later);
    }

    #[test]
    fn test_serializes_camel_case() {
        let record = AccessAttempt::first_failure(&key(), Utc::now());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("attemptCount").is_some());
        assert!(json.get("lockExpiry").is_some());
        assert!(json.get("isLocked").is_some());
    }
}
