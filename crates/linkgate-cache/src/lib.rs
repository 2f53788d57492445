//! # linkgate-cache
//!
//! Versioned key-value stores for per-requester throttling state.
//! Supports two modes:
//!
//! - **memory**: In-process map using [dashmap](https://crates.io/crates/dashmap)
//! - **redis**: Redis-backed store using the [redis](https://crates.io/crates/redis) crate,
//!   with compare-and-swap done in a Lua script
//!
//! The backend is selected at runtime based on configuration.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::KvStoreManager;
