//! Access log recording, listing, and export.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use linkgate_core::config::AuditConfig;
use linkgate_core::result::AppResult;
use linkgate_core::traits::Clock;
use linkgate_core::types::pagination::{CursorPage, LogCursor};
use linkgate_database::repositories::AccessLogStore;
use linkgate_entity::audit::{ANONYMOUS_REQUESTER, AccessAction, AccessLogEntry};

use super::redact::{mask_ip, sanitize_metadata};
use super::token::{decode_page_token, encode_page_token};

/// Bytes of randomness in a log id suffix.
const LOG_ID_RANDOM_BYTES: usize = 8;

/// One page of log entries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPage {
    /// Entries, newest first.
    pub entries: Vec<AccessLogEntry>,
    /// Token for the next page, if there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Writes and reads the access log.
///
/// Writing never fails the caller: an entry that cannot be stored is
/// reported through `tracing` and dropped.
#[derive(Debug, Clone)]
pub struct AuditLogger {
    /// Backing log store.
    store: Arc<dyn AccessLogStore>,
    /// Time source for entry timestamps.
    clock: Arc<dyn Clock>,
    /// Page and retention bounds.
    config: AuditConfig,
}

impl AuditLogger {
    /// Creates a new audit logger.
    pub fn new(store: Arc<dyn AccessLogStore>, clock: Arc<dyn Clock>, config: AuditConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Record one access event.
    ///
    /// The address is masked and the metadata sanitized before anything
    /// is stored. Returns the stored entry, or `None` if the store failed.
    pub async fn record(
        &self,
        resource_id: &str,
        file_id: Option<&str>,
        requester_id: Option<&str>,
        ip: &str,
        action: AccessAction,
        metadata: Option<Value>,
    ) -> Option<AccessLogEntry> {
        let now = self.clock.now();
        let entry = AccessLogEntry {
            log_id: generate_log_id(resource_id, now),
            resource_id: resource_id.to_string(),
            file_id: file_id.map(String::from),
            requester_id: requester_id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or(ANONYMOUS_REQUESTER)
                .to_string(),
            ip_address: mask_ip(ip),
            action,
            timestamp: now,
            metadata: sanitize_metadata(metadata.unwrap_or_else(|| Value::Object(Default::default()))),
            expires_at: self
                .config
                .retention_days
                .and_then(Duration::try_days)
                .and_then(|ttl| now.checked_add_signed(ttl)),
        };

        match self.store.append(&entry).await {
            Ok(()) => {
                debug!(log_id = %entry.log_id, action = %action, "Access event recorded");
                Some(entry)
            }
            Err(e) => {
                warn!(
                    resource_id = %resource_id,
                    action = %action,
                    error = %e,
                    "Failed to record access event"
                );
                None
            }
        }
    }

    /// List a resource's entries, newest first.
    ///
    /// `limit` defaults to the configured page size and is clamped to the
    /// configured maximum. A malformed `page_token` restarts the listing
    /// from the newest entry.
    pub async fn list(
        &self,
        resource_id: &str,
        limit: Option<u32>,
        page_token: Option<&str>,
    ) -> AppResult<LogPage> {
        let limit = limit
            .unwrap_or(self.config.default_page_size)
            .clamp(1, self.config.max_page_size) as usize;

        let cursor = page_token.and_then(|token| {
            let decoded = decode_page_token(token);
            if decoded.is_none() {
                debug!(resource_id = %resource_id, "Ignoring malformed page token");
            }
            decoded
        });

        let items = self
            .store
            .find_page(resource_id, cursor.as_ref(), limit + 1, self.clock.now())
            .await?;
        let page = CursorPage::from_overfetch(items, limit, |entry: &AccessLogEntry| LogCursor {
            timestamp: entry.timestamp,
            log_id: entry.log_id.clone(),
        });

        Ok(LogPage {
            entries: page.items,
            next_page_token: page.next_cursor.as_ref().map(encode_page_token),
        })
    }

    /// Export a resource's entries between two instants, oldest first.
    ///
    /// Bounds are RFC 3339 timestamps or `YYYY-MM-DD` dates. An unparseable
    /// start falls back to the Unix epoch and an unparseable end to now.
    /// At most the configured export cap is returned.
    pub async fn export(
        &self,
        resource_id: &str,
        start: Option<&str>,
        end: Option<&str>,
    ) -> AppResult<Vec<AccessLogEntry>> {
        let start = start.and_then(parse_bound).unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let end = end.and_then(parse_bound).unwrap_or_else(|| self.clock.now());
        self.export_range(resource_id, start, end).await
    }

    /// Export a resource's entries in `[start, end]`, oldest first.
    pub async fn export_range(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<AccessLogEntry>> {
        if start > end {
            return Ok(Vec::new());
        }
        self.store
            .find_range(
                resource_id,
                start,
                end,
                self.config.export_cap as usize,
                self.clock.now(),
            )
            .await
    }

    /// Drop entries past their retention.
    pub async fn purge_expired(&self) -> AppResult<u64> {
        self.store.purge_expired(self.clock.now()).await
    }
}

/// Build a log id: `resourceId:timestampMillis:randomHex`.
fn generate_log_id(resource_id: &str, now: DateTime<Utc>) -> String {
    let mut suffix = [0u8; LOG_ID_RANDOM_BYTES];
    OsRng.fill_bytes(&mut suffix);
    format!("{resource_id}:{}:{}", now.timestamp_millis(), hex::encode(suffix))
}

fn parse_bound(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use linkgate_core::traits::ManualClock;
    use linkgate_database::memory::MemoryAccessLogStore;
    use serde_json::json;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn logger(config: AuditConfig) -> (AuditLogger, ManualClock) {
        let clock = ManualClock::new(start());
        let logger = AuditLogger::new(
            Arc::new(MemoryAccessLogStore::new()),
            Arc::new(clock.clone()),
            config,
        );
        (logger, clock)
    }

    #[test]
    fn test_log_id_shape() {
        let id = generate_log_id("R1", start());
        let parts: Vec<&str> = id.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "R1");
        assert_eq!(parts[1], start().timestamp_millis().to_string());
        assert_eq!(parts[2].len(), LOG_ID_RANDOM_BYTES * 2);
        assert_ne!(id, generate_log_id("R1", start()));
    }

    #[test]
    fn test_parse_bound() {
        assert_eq!(parse_bound("2025-06-01T12:00:00Z"), Some(start()));
        assert_eq!(
            parse_bound("2025-06-01"),
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_bound("yesterday"), None);
    }

    #[tokio::test]
    async fn test_record_redacts() {
        let (logger, _clock) = logger(AuditConfig::default());
        let entry = logger
            .record(
                "R1",
                None,
                None,
                "203.0.113.9",
                AccessAction::Verify,
                Some(json!({"password": "hunter2", "success": false})),
            )
            .await
            .unwrap();
        assert_eq!(entry.ip_address, "203.0.113.xxx");
        assert_eq!(entry.requester_id, ANONYMOUS_REQUESTER);
        assert_eq!(entry.metadata, json!({"success": false}));
        assert_eq!(entry.expires_at, Some(start() + Duration::days(90)));
    }

    #[tokio::test]
    async fn test_list_pages_newest_first() {
        let (logger, clock) = logger(AuditConfig::default());
        for _ in 0..5 {
            logger
                .record("R1", None, Some("u1"), "10.0.0.1", AccessAction::View, None)
                .await
                .unwrap();
            clock.advance(Duration::seconds(1));
        }

        let first = logger.list("R1", Some(2), None).await.unwrap();
        assert_eq!(first.entries.len(), 2);
        assert!(first.entries[0].timestamp > first.entries[1].timestamp);
        let token = first.next_page_token.clone().unwrap();

        let second = logger.list("R1", Some(2), Some(&token)).await.unwrap();
        assert_eq!(second.entries.len(), 2);
        assert!(second.entries[0].timestamp < first.entries[1].timestamp);

        let third = logger
            .list("R1", Some(2), second.next_page_token.as_deref())
            .await
            .unwrap();
        assert_eq!(third.entries.len(), 1);
        assert!(third.next_page_token.is_none());
    }

    #[tokio::test]
    async fn test_malformed_token_restarts() {
        let (logger, _clock) = logger(AuditConfig::default());
        logger
            .record("R1", None, None, "10.0.0.1", AccessAction::View, None)
            .await
            .unwrap();
        let page = logger.list("R1", None, Some("%%%not-a-token")).await.unwrap();
        assert_eq!(page.entries.len(), 1);
    }

    #[tokio::test]
    async fn test_limit_is_clamped() {
        let config = AuditConfig {
            default_page_size: 2,
            max_page_size: 3,
            ..AuditConfig::default()
        };
        let (logger, clock) = logger(config);
        for _ in 0..5 {
            logger
                .record("R1", None, None, "10.0.0.1", AccessAction::View, None)
                .await
                .unwrap();
            clock.advance(Duration::milliseconds(5));
        }
        assert_eq!(logger.list("R1", None, None).await.unwrap().entries.len(), 2);
        assert_eq!(logger.list("R1", Some(100), None).await.unwrap().entries.len(), 3);
        assert_eq!(logger.list("R1", Some(0), None).await.unwrap().entries.len(), 1);
    }

    #[tokio::test]
    async fn test_export_range_and_cap() {
        let config = AuditConfig {
            export_cap: 3,
            ..AuditConfig::default()
        };
        let (logger, clock) = logger(config);
        for _ in 0..5 {
            logger
                .record("R1", None, None, "10.0.0.1", AccessAction::Download, None)
                .await
                .unwrap();
            clock.advance(Duration::minutes(1));
        }

        let all = logger.export("R1", Some("not a date"), None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[0].timestamp < all[1].timestamp);

        let window = logger
            .export(
                "R1",
                Some("2025-06-01T12:01:00Z"),
                Some("2025-06-01T12:02:00Z"),
            )
            .await
            .unwrap();
        assert_eq!(window.len(), 2);

        let inverted = logger
            .export("R1", Some("2025-06-02"), Some("2025-06-01"))
            .await
            .unwrap();
        assert!(inverted.is_empty());
    }
}
