//! Audit log configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Largest page any caller may request.
pub const MAX_PAGE_SIZE_LIMIT: u32 = 1000;

/// Longest retention accepted, in days.
pub const MAX_RETENTION_DAYS: i64 = 36_500;

/// Bounds for audit log retrieval and retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Page size used when the caller does not ask for one.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    /// Hard upper bound on a single page.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    /// Hard upper bound on entries returned by one export.
    #[serde(default = "default_export_cap")]
    pub export_cap: u32,
    /// Days an entry is kept before it expires. `None` keeps entries forever.
    #[serde(default = "default_retention")]
    pub retention_days: Option<i64>,
}

impl AuditConfig {
    /// Validate the bounds.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_page_size == 0 || self.default_page_size == 0 {
            return Err(AppError::configuration("audit page sizes must be positive"));
        }
        if self.default_page_size > self.max_page_size {
            return Err(AppError::configuration(
                "audit.default_page_size exceeds audit.max_page_size",
            ));
        }
        if self.max_page_size > MAX_PAGE_SIZE_LIMIT {
            return Err(AppError::configuration(format!(
                "audit.max_page_size must not exceed {MAX_PAGE_SIZE_LIMIT}"
            )));
        }
        if self.export_cap == 0 {
            return Err(AppError::configuration("audit.export_cap must be positive"));
        }
        if let Some(days) = self.retention_days {
            if !(1..=MAX_RETENTION_DAYS).contains(&days) {
                return Err(AppError::configuration(format!(
                    "audit.retention_days must be between 1 and {MAX_RETENTION_DAYS}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            export_cap: default_export_cap(),
            retention_days: default_retention(),
        }
    }
}

fn default_page_size() -> u32 {
    50
}

fn default_max_page_size() -> u32 {
    1000
}

fn default_export_cap() -> u32 {
    10_000
}

fn default_retention() -> Option<i64> {
    Some(90)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(AuditConfig::default().validate().is_ok());
    }

    #[test]
    fn test_page_size_capped() {
        let config = AuditConfig {
            max_page_size: MAX_PAGE_SIZE_LIMIT + 1,
            ..AuditConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retention_bounds() {
        for days in [0, -3, MAX_RETENTION_DAYS + 1, i64::MAX] {
            let config = AuditConfig {
                retention_days: Some(days),
                ..AuditConfig::default()
            };
            assert!(config.validate().is_err(), "{days} days accepted");
        }

        let forever = AuditConfig {
            retention_days: None,
            ..AuditConfig::default()
        };
        assert!(forever.validate().is_ok());
    }
}
