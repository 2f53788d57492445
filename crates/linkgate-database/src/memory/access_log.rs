//! In-memory append-only access log.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use linkgate_core::result::AppResult;
use linkgate_core::types::pagination::LogCursor;
use linkgate_entity::audit::AccessLogEntry;

use crate::repositories::AccessLogStore;

/// In-memory access log, partitioned by resource id.
#[derive(Debug, Clone, Default)]
pub struct MemoryAccessLogStore {
    partitions: Arc<DashMap<String, Vec<AccessLogEntry>>>,
}

impl MemoryAccessLogStore {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every live entry of a resource, newest first.
    fn live_desc(&self, resource_id: &str, now: DateTime<Utc>) -> Vec<AccessLogEntry> {
        let mut entries: Vec<AccessLogEntry> = self
            .partitions
            .get(resource_id)
            .map(|p| {
                p.value()
                    .iter()
                    .filter(|e| e.expires_at.is_none_or(|at| at > now))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        entries.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.log_id.cmp(&a.log_id))
        });
        entries
    }
}

#[async_trait]
impl AccessLogStore for MemoryAccessLogStore {
    async fn append(&self, entry: &AccessLogEntry) -> AppResult<()> {
        self.partitions
            .entry(entry.resource_id.clone())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn find_page(
        &self,
        resource_id: &str,
        after: Option<&LogCursor>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<AccessLogEntry>> {
        Ok(self
            .live_desc(resource_id, now)
            .into_iter()
            .filter(|e| after.is_none_or(|c| c.precedes(e.timestamp, &e.log_id)))
            .take(limit)
            .collect())
    }

    async fn find_range(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<AccessLogEntry>> {
        let mut entries = self.live_desc(resource_id, now);
        entries.reverse();
        Ok(entries
            .into_iter()
            .filter(|e| e.timestamp >= start && e.timestamp <= end)
            .take(limit)
            .collect())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut removed = 0u64;
        for mut partition in self.partitions.iter_mut() {
            let before = partition.len();
            partition.retain(|e| e.expires_at.is_none_or(|at| at > now));
            removed += (before - partition.len()) as u64;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use linkgate_entity::audit::AccessAction;

    fn entry(id: &str, at: DateTime<Utc>, expires_at: Option<DateTime<Utc>>) -> AccessLogEntry {
        AccessLogEntry {
            log_id: id.to_string(),
            resource_id: "r1".to_string(),
            file_id: None,
            requester_id: "anonymous".to_string(),
            ip_address: "1.2.3.xxx".to_string(),
            action: AccessAction::Verify,
            timestamp: at,
            metadata: serde_json::json!({}),
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_pages_newest_first() {
        let store = MemoryAccessLogStore::new();
        let now = Utc::now();
        for i in 0..5 {
            store
                .append(&entry(&format!("id{i}"), now + Duration::seconds(i), None))
                .await
                .unwrap();
        }

        let first = store.find_page("r1", None, 2, now).await.unwrap();
        let ids: Vec<_> = first.iter().map(|e| e.log_id.as_str()).collect();
        assert_eq!(ids, vec!["id4", "id3"]);

        let cursor = LogCursor {
            timestamp: first[1].timestamp,
            log_id: first[1].log_id.clone(),
        };
        let second = store.find_page("r1", Some(&cursor), 10, now).await.unwrap();
        let ids: Vec<_> = second.iter().map(|e| e.log_id.as_str()).collect();
        assert_eq!(ids, vec!["id2", "id1", "id0"]);
    }

    #[tokio::test]
    async fn test_range_is_inclusive_and_ascending() {
        let store = MemoryAccessLogStore::new();
        let now = Utc::now();
        for i in 0..5 {
            store
                .append(&entry(&format!("id{i}"), now + Duration::seconds(i), None))
                .await
                .unwrap();
        }
        let found = store
            .find_range("r1", now + Duration::seconds(1), now + Duration::seconds(3), 100, now)
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(|e| e.log_id.as_str()).collect();
        assert_eq!(ids, vec!["id1", "id2", "id3"]);
    }

    #[tokio::test]
    async fn test_expired_entries_hidden_and_purged() {
        let store = MemoryAccessLogStore::new();
        let now = Utc::now();
        store
            .append(&entry("old", now, Some(now - Duration::seconds(1))))
            .await
            .unwrap();
        store.append(&entry("live", now, None)).await.unwrap();

        let page = store.find_page("r1", None, 10, now).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(store.purge_expired(now).await.unwrap(), 1);
    }
}
