//! IP restriction entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Allow-list of requester addresses for one permission.
///
/// Rules are stored as the normalized strings accepted at update time:
/// literal addresses, CIDR blocks (`ip/prefix`), or wildcard patterns
/// with `*` octets. A disabled restriction or an empty rule list lets
/// every requester through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct IpRestriction {
    /// The permission this restriction belongs to.
    pub permission_id: String,
    /// Whether the allow-list is enforced.
    pub enabled: bool,
    /// Ordered allow rules.
    pub allowed_rules: Vec<String>,
    /// Last time the rule set was replaced.
    pub updated_at: DateTime<Utc>,
}

impl IpRestriction {
    /// Whether this restriction constrains anyone at all.
    pub fn is_enforced(&self) -> bool {
        self.enabled && !self.allowed_rules.is_empty()
    }
}
