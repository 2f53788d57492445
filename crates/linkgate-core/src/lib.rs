//! # linkgate-core
//!
//! Core crate for LinkGate. Contains the store traits the access-control
//! services depend on, configuration schemas, the injectable clock,
//! cursor pagination types, and the unified error system.
//!
//! This crate has **no** internal dependencies on other LinkGate crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
