//! PBKDF2-SHA512 password hashing and verification.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha512;
use subtle::ConstantTimeEq;

use linkgate_core::config::AccessConfig;
use linkgate_core::config::access::MIN_HASH_ITERATIONS;
use linkgate_entity::permission::PasswordRecord;

/// Length of the derived key in bytes.
const KEY_LEN: usize = 64;
/// Length of a generated salt in bytes (before hex encoding).
const SALT_LEN: usize = 16;

/// A derived key and the salt it was derived with, both hex-encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    /// Hex-encoded 64-byte derived key.
    pub hash: String,
    /// Hex-encoded salt.
    pub salt: String,
}

impl std::fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HashedPassword { .. }")
    }
}

impl From<HashedPassword> for PasswordRecord {
    fn from(hashed: HashedPassword) -> Self {
        PasswordRecord::Salted {
            hash: hashed.hash,
            salt: hashed.salt,
        }
    }
}

/// Outcome of checking a password against a stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordCheck {
    /// The password matches a salted record.
    Match,
    /// The password matches a legacy record; the caller should store the
    /// salted replacement.
    LegacyMatch(HashedPassword),
    /// The password does not match.
    Mismatch,
    /// The record holds no password to compare against.
    NotConfigured,
}

impl PasswordCheck {
    /// Whether the password was accepted.
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match | Self::LegacyMatch(_))
    }
}

/// Handles password hashing and verification using PBKDF2-HMAC-SHA512.
///
/// The hex text of the salt (not its decoded bytes) is the KDF salt input.
/// Stored records depend on this; changing it invalidates every password.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    iterations: u32,
}

impl PasswordHasher {
    /// Creates a hasher with an explicit work factor.
    ///
    /// Values below the minimum are raised to it.
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(MIN_HASH_ITERATIONS),
        }
    }

    /// Creates a hasher from the access policy.
    pub fn from_config(config: &AccessConfig) -> Self {
        Self::new(config.hash_iterations)
    }

    /// Generate a fresh random salt from the OS CSPRNG, hex-encoded.
    pub fn generate_salt() -> String {
        let mut bytes = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Hash `password`, with a fresh salt unless one is given.
    pub fn hash(&self, password: &str, salt: Option<&str>) -> HashedPassword {
        let salt = match salt {
            Some(s) => s.to_string(),
            None => Self::generate_salt(),
        };
        let key = self.derive(password, &salt);
        HashedPassword {
            hash: hex::encode(key),
            salt,
        }
    }

    /// Check `password` against a salted hash in constant time.
    ///
    /// Malformed input (non-hex hash, wrong length) is a mismatch, never a
    /// panic or an error.
    pub fn verify(&self, password: &str, hash: &str, salt: &str) -> bool {
        let Ok(expected) = hex::decode(hash) else {
            return false;
        };
        if expected.len() != KEY_LEN {
            return false;
        }
        let derived = self.derive(password, salt);
        derived.as_slice().ct_eq(expected.as_slice()).into()
    }

    /// Check `password` against a legacy base64 record.
    pub fn verify_legacy(password: &str, encoded: &str) -> bool {
        let candidate = BASE64.encode(password.as_bytes());
        candidate.as_bytes().ct_eq(encoded.as_bytes()).into()
    }

    /// Check `password` against whichever format `record` uses.
    pub fn check(&self, password: &str, record: &PasswordRecord) -> PasswordCheck {
        match record {
            PasswordRecord::Unprotected => PasswordCheck::NotConfigured,
            PasswordRecord::Salted { hash, salt } => {
                if self.verify(password, hash, salt) {
                    PasswordCheck::Match
                } else {
                    PasswordCheck::Mismatch
                }
            }
            PasswordRecord::Legacy { encoded } => {
                if Self::verify_legacy(password, encoded) {
                    PasswordCheck::LegacyMatch(self.hash(password, None))
                } else {
                    PasswordCheck::Mismatch
                }
            }
        }
    }

    fn derive(&self, password: &str, salt: &str) -> [u8; KEY_LEN] {
        let mut key = [0u8; KEY_LEN];
        pbkdf2::pbkdf2_hmac::<Sha512>(password.as_bytes(), salt.as_bytes(), self.iterations, &mut key);
        key
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(MIN_HASH_ITERATIONS)
    }
}
