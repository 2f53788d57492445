//! Failed-attempt counting and lockout.

pub mod tracker;

pub use tracker::{AttemptTracker, is_currently_locked};
