//! Verification outcome types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use linkgate_entity::resource::ResourceSummary;

/// Why a verification ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// Access granted.
    Granted,
    /// Too many failures; the requester is locked out for a while.
    Locked,
    /// The requester address is not on the allow-list.
    IpNotAllowed,
    /// No such share resource.
    ResourceNotFound,
    /// The resource has no protection record.
    PermissionNotFound,
    /// The link has expired.
    Expired,
    /// The resource is protected and no password was given.
    PasswordRequired,
    /// The password did not match.
    InvalidPassword,
}

impl ReasonCode {
    /// The wire name of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Locked => "locked",
            Self::IpNotAllowed => "ip_not_allowed",
            Self::ResourceNotFound => "resource_not_found",
            Self::PermissionNotFound => "permission_not_found",
            Self::Expired => "expired",
            Self::PasswordRequired => "password_required",
            Self::InvalidPassword => "invalid_password",
        }
    }

    /// HTTP status code the request layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Granted => 200,
            Self::PasswordRequired | Self::InvalidPassword => 401,
            Self::Locked | Self::IpNotAllowed | Self::Expired => 403,
            Self::ResourceNotFound | Self::PermissionNotFound => 404,
        }
    }

    /// Default human-readable message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Granted => "Access granted",
            Self::Locked => "Too many failed attempts. Try again later.",
            Self::IpNotAllowed => "Access from this IP address is not allowed",
            Self::ResourceNotFound => "Share link not found",
            Self::PermissionNotFound => "Share link is not configured",
            Self::Expired => "Share link has expired",
            Self::PasswordRequired => "Password is required",
            Self::InvalidPassword => "Invalid password",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The answer to one verification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// Whether access is granted.
    pub success: bool,
    /// Human-readable explanation.
    pub message: String,
    /// Machine-readable reason.
    pub reason_code: ReasonCode,
    /// Password attempts left before lockout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_attempts: Option<u32>,
    /// Whether the requester is locked out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_locked: Option<bool>,
    /// When the lockout ends.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_expiry: Option<DateTime<Utc>>,
    /// What the requester may learn about the resource once granted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_summary: Option<ResourceSummary>,
}

impl VerificationResult {
    /// A grant carrying the resource summary.
    pub fn granted(summary: ResourceSummary) -> Self {
        Self {
            resource_summary: Some(summary),
            ..Self::with_code(ReasonCode::Granted)
        }
    }

    /// A denial with no extra detail.
    pub fn denied(reason: ReasonCode) -> Self {
        Self::with_code(reason)
    }

    /// A lockout denial.
    pub fn locked(lock_expiry: Option<DateTime<Utc>>) -> Self {
        Self {
            remaining_attempts: Some(0),
            is_locked: Some(true),
            lock_expiry,
            ..Self::with_code(ReasonCode::Locked)
        }
    }

    /// Attach the remaining-attempt count.
    pub fn with_remaining(mut self, remaining: u32) -> Self {
        self.remaining_attempts = Some(remaining);
        self
    }

    /// Attach the lock state.
    pub fn with_lock(mut self, lock_expiry: Option<DateTime<Utc>>) -> Self {
        self.is_locked = Some(true);
        self.lock_expiry = lock_expiry;
        self
    }

    /// HTTP status for this result.
    pub fn http_status(&self) -> u16 {
        self.reason_code.http_status()
    }

    fn with_code(reason: ReasonCode) -> Self {
        Self {
            success: reason == ReasonCode::Granted,
            message: reason.message().to_string(),
            reason_code: reason,
            remaining_attempts: None,
            is_locked: None,
            lock_expiry: None,
            resource_summary: None,
        }
    }
}
