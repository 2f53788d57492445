//! Protection configuration entities: password records and IP restrictions.

pub mod ip;
pub mod model;
pub mod password;

pub use ip::IpRestriction;
pub use model::AccessPermission;
pub use password::PasswordRecord;
