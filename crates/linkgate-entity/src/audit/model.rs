//! Access log entry entity model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Requester id recorded when the caller is not signed in.
pub const ANONYMOUS_REQUESTER: &str = "anonymous";

/// What the requester did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "access_action", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccessAction {
    /// A password / access verification.
    Verify,
    /// A file download.
    Download,
    /// A listing or preview of the share.
    View,
    /// A change to the share's protection settings.
    Update,
}

impl AccessAction {
    /// The lowercase tag stored in the log.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verify => "verify",
            Self::Download => "download",
            Self::View => "view",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for AccessAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccessAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "verify" => Ok(Self::Verify),
            "download" => Ok(Self::Download),
            "view" => Ok(Self::View),
            "update" => Ok(Self::Update),
            other => Err(format!("unknown access action '{other}'")),
        }
    }
}

/// An immutable, privacy-redacted record of one access event.
///
/// The IP address is already masked and the metadata already stripped of
/// credentials when the entry is built; stores persist it verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AccessLogEntry {
    /// `resourceId:timestampMillis:random`.
    pub log_id: String,
    /// The resource accessed.
    pub resource_id: String,
    /// The individual file, for downloads.
    pub file_id: Option<String>,
    /// Signed-in user id, or [`ANONYMOUS_REQUESTER`].
    pub requester_id: String,
    /// Masked requester address.
    pub ip_address: String,
    /// What happened.
    pub action: AccessAction,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
    /// Sanitized free-form details.
    pub metadata: serde_json::Value,
    /// When the store may drop the entry.
    pub expires_at: Option<DateTime<Utc>>,
}
