//! Access audit log entities.

pub mod model;

pub use model::{AccessAction, AccessLogEntry, ANONYMOUS_REQUESTER};
