//! Process-local record stores backed by `dashmap`.
//!
//! Suitable for single-node development and for tests. Nothing survives a
//! restart.

mod access_log;
mod records;

pub use access_log::MemoryAccessLogStore;
pub use records::{MemoryIpRestrictionStore, MemoryPermissionStore, MemoryResourceStore};
