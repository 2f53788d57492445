//! Store traits for access-control records and their PostgreSQL
//! implementations.
//!
//! The access services only see the traits, so each backend (PostgreSQL,
//! in-memory, or a test fake) can be swapped in at construction time.

pub mod access_log;
pub mod ip_restriction;
pub mod permission;
pub mod resource;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use linkgate_core::result::AppResult;
use linkgate_core::types::pagination::LogCursor;
use linkgate_entity::audit::AccessLogEntry;
use linkgate_entity::permission::{AccessPermission, IpRestriction, PasswordRecord};
use linkgate_entity::resource::ShareResource;

pub use access_log::AccessLogRepository;
pub use ip_restriction::IpRestrictionRepository;
pub use permission::PermissionRepository;
pub use resource::ResourceRepository;

/// Lookup of share resources (file groups).
#[async_trait]
pub trait ResourceStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find a resource by id.
    async fn find_by_id(&self, id: &str) -> AppResult<Option<ShareResource>>;

    /// Insert a new resource.
    async fn create(&self, resource: &ShareResource) -> AppResult<ShareResource>;

    /// Change the expiration. Returns `false` if the resource does not exist.
    async fn update_expiration(&self, id: &str, expiration: DateTime<Utc>) -> AppResult<bool>;

    /// Set whether recipients need a password. Returns `false` if the
    /// resource does not exist.
    async fn update_protection(&self, id: &str, is_password_protected: bool) -> AppResult<bool>;

    /// Remove a resource. Returns `false` if it did not exist.
    async fn delete(&self, id: &str) -> AppResult<bool>;
}

/// Lookup and mutation of protection records.
#[async_trait]
pub trait PermissionStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find a permission by id.
    async fn find_by_id(&self, id: &str) -> AppResult<Option<AccessPermission>>;

    /// Insert a new permission.
    async fn create(&self, permission: &AccessPermission) -> AppResult<AccessPermission>;

    /// Replace the stored password. Returns `false` if the permission does not exist.
    async fn update_password(
        &self,
        id: &str,
        password: &PasswordRecord,
        updated_at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Replace the stored password only while it still equals `expected`.
    ///
    /// Returns `false` if the permission does not exist or now holds a
    /// different password.
    async fn replace_password(
        &self,
        id: &str,
        expected: &PasswordRecord,
        password: &PasswordRecord,
        updated_at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Change the expiration. Returns `false` if the permission does not exist.
    async fn update_expiration(
        &self,
        id: &str,
        expiration: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> AppResult<bool>;
}

/// IP allow-lists keyed by permission id.
#[async_trait]
pub trait IpRestrictionStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find the restriction of a permission.
    async fn find(&self, permission_id: &str) -> AppResult<Option<IpRestriction>>;

    /// Replace the restriction of a permission wholesale.
    async fn upsert(&self, restriction: &IpRestriction) -> AppResult<IpRestriction>;
}

/// Append-only access log.
#[async_trait]
pub trait AccessLogStore: Send + Sync + std::fmt::Debug + 'static {
    /// Persist a new entry.
    async fn append(&self, entry: &AccessLogEntry) -> AppResult<()>;

    /// Newest-first entries of a resource strictly after `after` in that
    /// order, at most `limit` of them. Entries expired at `now` are skipped.
    async fn find_page(
        &self,
        resource_id: &str,
        after: Option<&LogCursor>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<AccessLogEntry>>;

    /// Oldest-first entries of a resource with `start <= timestamp <= end`,
    /// at most `limit` of them. Entries expired at `now` are skipped.
    async fn find_range(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<AccessLogEntry>>;

    /// Drop entries whose retention has passed. Returns the number removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
}
