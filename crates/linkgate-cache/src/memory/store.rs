//! In-memory versioned key-value store using `dashmap`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;
use tracing::debug;

use linkgate_core::result::AppResult;
use linkgate_core::traits::kv::{KeyValueStore, Versioned};

/// A stored value with its write counter and eviction deadline.
#[derive(Debug, Clone)]
struct Slot {
    value: String,
    version: u64,
    expires_at: Instant,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Successful writes between two sweeps of expired keys.
const DEFAULT_SWEEP_INTERVAL: u64 = 256;

/// In-memory key-value store.
///
/// Each key's compare-and-swap runs under the map's shard lock for that
/// key, which makes it atomic for a single node. Expired keys are treated
/// as absent, and every few hundred writes the whole map is swept of them.
#[derive(Debug, Clone)]
pub struct MemoryKvStore {
    slots: Arc<DashMap<String, Slot>>,
    writes: Arc<AtomicU64>,
    sweep_interval: u64,
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::with_sweep_interval(DEFAULT_SWEEP_INTERVAL)
    }
}

impl MemoryKvStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that sweeps expired keys every `interval`
    /// successful writes.
    pub fn with_sweep_interval(interval: u64) -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
            writes: Arc::new(AtomicU64::new(0)),
            sweep_interval: interval.max(1),
        }
    }

    /// Number of keys currently held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drop every expired key. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.slots.len();
        self.slots.retain(|_, slot| slot.is_live(now));
        let removed = before.saturating_sub(self.slots.len());
        if removed > 0 {
            debug!(removed, "Swept expired keys");
        }
        removed
    }

    fn note_write(&self) {
        let count = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if count % self.sweep_interval == 0 {
            self.sweep_expired();
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> AppResult<Option<Versioned<String>>> {
        let now = Instant::now();
        Ok(self
            .slots
            .get(key)
            .filter(|slot| slot.is_live(now))
            .map(|slot| Versioned {
                value: slot.value.clone(),
                version: slot.version,
            }))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: &str,
        ttl: Duration,
    ) -> AppResult<bool> {
        let now = Instant::now();
        let expires_at = now + ttl;

        match self.slots.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let current = occupied.get();
                let current_version = current.is_live(now).then_some(current.version);
                if current_version != expected_version {
                    debug!(key, ?expected_version, ?current_version, "CAS version mismatch");
                    return Ok(false);
                }
                let version = current.version + 1;
                occupied.insert(Slot {
                    value: value.to_string(),
                    version,
                    expires_at,
                });
            }
            Entry::Vacant(vacant) => {
                if expected_version.is_some() {
                    return Ok(false);
                }
                vacant.insert(Slot {
                    value: value.to_string(),
                    version: 1,
                    expires_at,
                });
            }
        }

        // The entry guard is released here; sweeping takes every shard lock.
        self.note_write();
        Ok(true)
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.slots.remove(key);
        Ok(())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_cas_create_then_update() {
        let store = MemoryKvStore::new();
        assert!(store.compare_and_swap("k", None, "one", TTL).await.unwrap());
        let stored = store.get("k").await.unwrap().unwrap();
        assert_eq!(stored.value, "one");
        assert_eq!(stored.version, 1);

        assert!(store.compare_and_swap("k", Some(1), "two", TTL).await.unwrap());
        let stored = store.get("k").await.unwrap().unwrap();
        assert_eq!(stored.value, "two");
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn test_cas_rejects_stale_version() {
        let store = MemoryKvStore::new();
        store.compare_and_swap("k", None, "one", TTL).await.unwrap();
        assert!(!store.compare_and_swap("k", None, "dup", TTL).await.unwrap());
        assert!(!store.compare_and_swap("k", Some(7), "x", TTL).await.unwrap());
        assert!(!store.compare_and_swap("absent", Some(1), "x", TTL).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().unwrap().value, "one");
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryKvStore::new();
        store.compare_and_swap("k", None, "one", TTL).await.unwrap();
        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
        assert!(store.compare_and_swap("k", None, "again", TTL).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_key_is_absent() {
        let store = MemoryKvStore::new();
        store
            .compare_and_swap("k", None, "one", Duration::from_secs(5))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;

        assert!(store.get("k").await.unwrap().is_none());
        assert!(store.compare_and_swap("k", None, "fresh", TTL).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_sweep_expired_keys() {
        let store = MemoryKvStore::with_sweep_interval(4);
        for ip in ["a", "b", "c"] {
            store
                .compare_and_swap(ip, None, "1", Duration::from_secs(5))
                .await
                .unwrap();
        }
        assert_eq!(store.len(), 3);
        tokio::time::advance(Duration::from_secs(6)).await;

        store.compare_and_swap("d", None, "1", TTL).await.unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get("d").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_keeps_live_keys() {
        let store = MemoryKvStore::new();
        store
            .compare_and_swap("old", None, "1", Duration::from_secs(5))
            .await
            .unwrap();
        store.compare_and_swap("new", None, "1", TTL).await.unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(store.sweep_expired(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get("new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_json_helper() {
        let store = MemoryKvStore::new();
        let data = serde_json::json!({"attemptCount": 2});
        store
            .compare_and_swap("k", None, &data.to_string(), TTL)
            .await
            .unwrap();
        let typed: Versioned<serde_json::Value> = store.get_json("k").await.unwrap().unwrap();
        assert_eq!(typed.value, data);
        assert_eq!(typed.version, 1);
    }
}
