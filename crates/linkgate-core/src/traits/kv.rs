//! Versioned key-value store trait for per-key throttling state.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;

/// A stored value together with the version it was written at.
///
/// Versions start at 1 and increase by one on every successful write, so
/// a reader can hand the version back to [`KeyValueStore::compare_and_swap`]
/// to detect concurrent writers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    /// The stored value.
    pub value: T,
    /// Write counter of the key.
    pub version: u64,
}

/// Trait for consistent key-value backends (in-memory or Redis).
///
/// Values are opaque strings (JSON). Implementations must make
/// `compare_and_swap` atomic per key.
#[async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug + 'static {
    /// Get a value and its version. Returns `None` if the key does not exist.
    async fn get(&self, key: &str) -> AppResult<Option<Versioned<String>>>;

    /// Write `value` only if the key is still at `expected_version`
    /// (`None` meaning "must not exist"). Returns `true` if the write happened.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: &str,
        ttl: Duration,
    ) -> AppResult<bool>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Get a typed value by deserializing from JSON.
    async fn get_json<T: serde::de::DeserializeOwned + Send>(
        &self,
        key: &str,
    ) -> AppResult<Option<Versioned<T>>>
    where
        Self: Sized,
    {
        match self.get(key).await? {
            Some(stored) => {
                let value = serde_json::from_str(&stored.value)?;
                Ok(Some(Versioned {
                    value,
                    version: stored.version,
                }))
            }
            None => Ok(None),
        }
    }
}
