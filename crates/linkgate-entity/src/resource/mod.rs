//! Share resource (file group) entities.

pub mod model;

pub use model::{ResourceSummary, ShareResource};
