//! Access decisions and protection management.

pub mod evaluator;
pub mod protection;
pub mod result;

pub use evaluator::AccessEvaluator;
pub use protection::{IpRestrictionUpdate, NewShare, ProtectionRecord, ProtectionService, RestrictionUpdateResult};
pub use result::{ReasonCode, VerificationResult};
