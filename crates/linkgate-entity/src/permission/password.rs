//! Stored password formats.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a share password is stored.
///
/// Persisted as two nullable columns (`password_hash`, `password_salt`).
/// Older shares stored only a base64 encoding of the password with no
/// salt; those records are upgraded to [`PasswordRecord::Salted`] the
/// first time they verify successfully.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum PasswordRecord {
    /// No password is set.
    Unprotected,
    /// Pre-migration format: base64 of the plaintext.
    Legacy {
        /// The base64 text as stored.
        encoded: String,
    },
    /// Hex PBKDF2 key and the hex salt it was derived with.
    Salted {
        /// Hex-encoded derived key.
        hash: String,
        /// Hex-encoded salt.
        salt: String,
    },
}

impl PasswordRecord {
    /// Interpret the persisted column pair.
    pub fn from_columns(hash: Option<String>, salt: Option<String>) -> Self {
        let hash = hash.filter(|h| !h.is_empty());
        let salt = salt.filter(|s| !s.is_empty());
        match (hash, salt) {
            (None, _) => Self::Unprotected,
            (Some(encoded), None) => Self::Legacy { encoded },
            (Some(hash), Some(salt)) => Self::Salted { hash, salt },
        }
    }

    /// Split back into the persisted column pair.
    pub fn to_columns(&self) -> (Option<String>, Option<String>) {
        match self {
            Self::Unprotected => (None, None),
            Self::Legacy { encoded } => (Some(encoded.clone()), None),
            Self::Salted { hash, salt } => (Some(hash.clone()), Some(salt.clone())),
        }
    }

    /// Whether any password is configured.
    pub fn is_protected(&self) -> bool {
        !matches!(self, Self::Unprotected)
    }

    /// Name of the storage format, safe to display.
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Unprotected => "none",
            Self::Legacy { .. } => "legacy",
            Self::Salted { .. } => "pbkdf2-sha512",
        }
    }
}

impl fmt::Debug for PasswordRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unprotected => write!(f, "Unprotected"),
            Self::Legacy { .. } => write!(f, "Legacy {{ .. }}"),
            Self::Salted { .. } => write!(f, "Salted {{ .. }}"),
        }
    }
}
