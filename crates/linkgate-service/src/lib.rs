//! # linkgate-service
//!
//! The share-link access layer. Services follow constructor injection:
//! every store, the clock, and the policy are handed in at construction
//! time as `Arc` references, so the same code runs against PostgreSQL and
//! Redis in production and against in-memory stores in tests.
//!
//! - [`AccessEvaluator`] decides whether a requester may open a link.
//! - [`ProtectionService`] creates and edits the protection of a link.
//! - [`AuditLogger`] records and retrieves redacted access events.

pub mod access;
pub mod app;
pub mod audit;

pub use access::{
    AccessEvaluator, ProtectionRecord, ProtectionService, ReasonCode, VerificationResult,
};
pub use app::AppServices;
pub use audit::{AuditLogger, LogPage};
