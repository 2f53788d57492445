//! Attempt-tracking store configuration.

use serde::{Deserialize, Serialize};

/// Where per-(resource, requester) attempt records live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptStoreConfig {
    /// Store backend: `"memory"` or `"redis"`.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Hours an idle attempt record is retained by stores that support
    /// key expiry. Lock state is always evaluated from the record itself.
    #[serde(default = "default_record_ttl")]
    pub record_ttl_hours: u64,
    /// Redis-specific settings.
    #[serde(default)]
    pub redis: RedisStoreConfig,
}

impl Default for AttemptStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            record_ttl_hours: default_record_ttl(),
            redis: RedisStoreConfig::default(),
        }
    }
}

/// Redis attempt store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisStoreConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Key prefix for all LinkGate keys.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

fn default_backend() -> String {
    "memory".to_string()
}

fn default_record_ttl() -> u64 {
    24
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    "linkgate:".to_string()
}
