//! Redis versioned key-value store.
//!
//! Each key is a hash with `value` and `version` fields. The
//! compare-and-swap runs as a Lua script so the version check and the
//! write happen atomically on the server, across every node sharing the
//! Redis instance.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use linkgate_core::error::{AppError, ErrorKind};
use linkgate_core::result::AppResult;
use linkgate_core::traits::kv::{KeyValueStore, Versioned};

use super::client::RedisClient;

/// Lua script for an atomic versioned write.
///
/// KEYS[1] = hash key
/// ARGV[1] = expected version ("" = key must not exist)
/// ARGV[2] = new value
/// ARGV[3] = TTL in milliseconds
///
/// Returns 1 if written, 0 on version mismatch.
const CAS_SCRIPT: &str = r#"
    local current = redis.call('HGET', KEYS[1], 'version')
    local expected = ARGV[1]

    if expected == '' then
        if current then
            return 0
        end
    elseif (not current) or current ~= expected then
        return 0
    end

    local next_version = 1
    if current then
        next_version = tonumber(current) + 1
    end

    redis.call('HSET', KEYS[1], 'value', ARGV[2], 'version', next_version)
    redis.call('PEXPIRE', KEYS[1], ARGV[3])
    return 1
"#;

/// Redis-backed key-value store for multi-node deployments.
#[derive(Debug, Clone)]
pub struct RedisKvStore {
    client: RedisClient,
    cas: redis::Script,
}

impl RedisKvStore {
    /// Create a new Redis key-value store.
    pub fn new(client: RedisClient) -> Self {
        Self {
            client,
            cas: redis::Script::new(CAS_SCRIPT),
        }
    }

    fn map_err(e: redis::RedisError) -> AppError {
        AppError::with_source(ErrorKind::Cache, format!("Redis error: {e}"), e)
    }
}

#[async_trait]
impl KeyValueStore for RedisKvStore {
    async fn get(&self, key: &str) -> AppResult<Option<Versioned<String>>> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let (value, version): (Option<String>, Option<u64>) = redis::cmd("HMGET")
            .arg(&full_key)
            .arg("value")
            .arg("version")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;

        match (value, version) {
            (Some(value), Some(version)) => Ok(Some(Versioned { value, version })),
            (None, None) => Ok(None),
            _ => Err(AppError::malformed_record(format!(
                "Key '{full_key}' is missing its value or version field"
            ))),
        }
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: &str,
        ttl: Duration,
    ) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let expected = expected_version.map(|v| v.to_string()).unwrap_or_default();
        let ttl_ms = ttl.as_millis().max(1) as u64;

        let written: i64 = self
            .cas
            .key(&full_key)
            .arg(expected)
            .arg(value)
            .arg(ttl_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(Self::map_err)?;

        Ok(written == 1)
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let _: () = conn.del(&full_key).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(pong == "PONG")
    }
}
