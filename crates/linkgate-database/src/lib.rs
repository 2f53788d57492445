//! # linkgate-database
//!
//! Record stores for LinkGate. The store traits in [`repositories`] are
//! what the access services depend on; PostgreSQL implementations live
//! next to them, and [`memory`] provides process-local implementations
//! for development and tests.

pub mod connection;
#[cfg(feature = "memory")]
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod stores;

pub use connection::DatabasePool;
pub use stores::Stores;
