//! Cursor pagination types for time-ordered listings.
//!
//! Offset pagination is unstable on an append-only log that grows while
//! it is being read, so listings continue from the position of the last
//! returned entry instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Position of an entry in a time-descending listing.
///
/// The log id breaks ties between entries written in the same millisecond.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogCursor {
    /// Timestamp of the last entry returned.
    pub timestamp: DateTime<Utc>,
    /// Id of the last entry returned.
    pub log_id: String,
}

impl LogCursor {
    /// Whether an entry at (`timestamp`, `log_id`) sorts strictly after
    /// this cursor in a newest-first listing.
    pub fn precedes(&self, timestamp: DateTime<Utc>, log_id: &str) -> bool {
        timestamp < self.timestamp || (timestamp == self.timestamp && log_id < self.log_id.as_str())
    }
}

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursorPage<T: Serialize> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Where the next page starts, if there is one.
    pub next_cursor: Option<LogCursor>,
}

impl<T: Serialize> CursorPage<T> {
    /// Build a page from a store result that fetched up to `limit + 1`
    /// items. The extra item only signals that another page exists.
    pub fn from_overfetch(
        mut items: Vec<T>,
        limit: usize,
        cursor_of: impl Fn(&T) -> LogCursor,
    ) -> Self {
        let has_more = items.len() > limit;
        items.truncate(limit);
        let next_cursor = if has_more {
            items.last().map(cursor_of)
        } else {
            None
        };
        Self { items, next_cursor }
    }
}
