//! Share resource entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A shareable unit: a group of uploaded files behind one link.
///
/// Created when an upload group is finalized. Deletion and the expiry
/// sweep belong to the upload collaborator; this crate only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ShareResource {
    /// Unique resource (group) identifier.
    pub id: String,
    /// User who created the share.
    pub owner_id: String,
    /// When the share was created.
    pub created_at: DateTime<Utc>,
    /// When the link stops working.
    pub expiration_date: DateTime<Utc>,
    /// Whether recipients must present a password.
    pub is_password_protected: bool,
    /// The protection record for this resource.
    pub permission_id: String,
}

impl ShareResource {
    /// The public summary returned on a successful verification.
    pub fn summary(&self) -> ResourceSummary {
        ResourceSummary {
            resource_id: self.id.clone(),
            expiration_date: self.expiration_date,
        }
    }
}

/// What a recipient learns about a resource after access is granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSummary {
    /// Resource identifier.
    pub resource_id: String,
    /// When the link stops working.
    pub expiration_date: DateTime<Utc>,
}
