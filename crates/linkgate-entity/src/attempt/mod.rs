//! Failed-attempt tracking entities.

pub mod model;

pub use model::{AccessAttempt, AttemptKey};
