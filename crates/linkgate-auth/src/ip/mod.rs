//! IP allow-list rules and matching.

pub mod matcher;
pub mod rule;

pub use matcher::{AllowList, AllowListCache, IpDecision, IpMatcher, NormalizedRules};
pub use rule::IpRule;
