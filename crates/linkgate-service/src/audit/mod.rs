//! Privacy-redacted access logging.

pub mod logger;
pub mod redact;
pub mod token;

pub use logger::{AuditLogger, LogPage};
pub use redact::{mask_ip, sanitize_metadata};
