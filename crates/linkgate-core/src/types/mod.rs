//! Shared domain types used across crates.

pub mod pagination;

pub use pagination::{CursorPage, LogCursor};
