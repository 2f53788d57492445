//! Access permission entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::password::PasswordRecord;

/// The protection configuration of one share resource.
///
/// The identity and owning resource never change; the password record and
/// expiration are rewritten when the owner changes settings or when a
/// legacy password is upgraded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessPermission {
    /// Unique permission identifier.
    pub id: String,
    /// The resource this permission protects.
    pub resource_id: String,
    /// When access stops being granted (mirrors the resource).
    pub expiration_date: DateTime<Utc>,
    /// Stored password, if any.
    pub password: PasswordRecord,
    /// Recipients the owner intended the link for. Enforced by the
    /// delivery collaborator, not by the access decision.
    pub allowed_emails: Vec<String>,
    /// User who created the permission.
    pub created_by: String,
    /// When the permission was created.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl AccessPermission {
    /// Whether the link has passed its expiration at `now`.
    ///
    /// Expiry is strict: a request at exactly the expiration instant is
    /// still served.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expiration_date
    }
}
