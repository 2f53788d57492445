//! Core traits defined in `linkgate-core` and implemented by other crates.

pub mod clock;
pub mod kv;

pub use clock::{Clock, ManualClock, SystemClock};
pub use kv::{KeyValueStore, Versioned};
