//! # linkgate-auth
//!
//! The leaf components of the share-link access decision.
//!
//! ## Modules
//!
//! - `password`: PBKDF2-SHA512 hashing, constant-time verification, and
//!   the legacy base64 format
//! - `ip`: allow-list rules (exact, CIDR, wildcard) and matching
//! - `lockout`: per-(resource, requester) failure counting and time-boxed locks

pub mod ip;
pub mod lockout;
pub mod password;

pub use ip::{IpDecision, IpMatcher, IpRule};
pub use lockout::AttemptTracker;
pub use password::{HashedPassword, PasswordCheck, PasswordHasher};
