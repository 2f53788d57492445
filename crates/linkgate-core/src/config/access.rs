//! Access-decision policy configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Lower bound for the key-derivation work factor.
pub const MIN_HASH_ITERATIONS: u32 = 10_000;

/// Lockout, hashing, and IP-restriction policy.
///
/// Injected into the access evaluator at construction so tests can run
/// with isolated settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Failed password attempts before a (resource, requester) pair is locked.
    #[serde(default = "default_lockout_threshold")]
    pub lockout_threshold: u32,
    /// How long a lock lasts, in minutes.
    #[serde(default = "default_lockout_duration")]
    pub lockout_duration_minutes: i64,
    /// PBKDF2 iteration count. Changing this invalidates existing hashes.
    #[serde(default = "default_hash_iterations")]
    pub hash_iterations: u32,
    /// Maximum number of rules kept on an IP restriction.
    #[serde(default = "default_max_ip_rules")]
    pub max_ip_rules: usize,
    /// Compare-and-swap retries when recording a failed attempt.
    #[serde(default = "default_cas_retries")]
    pub attempt_cas_retries: u32,
}

impl AccessConfig {
    /// Validate the policy values.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.lockout_threshold == 0 {
            return Err(AppError::configuration(
                "access.lockout_threshold must be at least 1",
            ));
        }
        if self.lockout_duration_minutes <= 0 {
            return Err(AppError::configuration(
                "access.lockout_duration_minutes must be positive",
            ));
        }
        if self.hash_iterations < MIN_HASH_ITERATIONS {
            return Err(AppError::configuration(format!(
                "access.hash_iterations must be at least {MIN_HASH_ITERATIONS}"
            )));
        }
        if self.attempt_cas_retries == 0 {
            return Err(AppError::configuration(
                "access.attempt_cas_retries must be at least 1",
            ));
        }
        Ok(())
    }

    /// The lock duration as a chrono duration.
    pub fn lockout_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.lockout_duration_minutes)
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            lockout_threshold: default_lockout_threshold(),
            lockout_duration_minutes: default_lockout_duration(),
            hash_iterations: default_hash_iterations(),
            max_ip_rules: default_max_ip_rules(),
            attempt_cas_retries: default_cas_retries(),
        }
    }
}

fn default_lockout_threshold() -> u32 {
    5
}

fn default_lockout_duration() -> i64 {
    30
}

fn default_hash_iterations() -> u32 {
    MIN_HASH_ITERATIONS
}

fn default_max_ip_rules() -> usize {
    100
}

fn default_cas_retries() -> u32 {
    5
}
