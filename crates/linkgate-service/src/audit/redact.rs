//! Redaction applied to every access log entry before it is stored.

use std::net::IpAddr;

use serde_json::{Map, Value};

/// Metadata keys that never reach the log, compared after
/// [`normalize_key`].
const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "passwordhash",
    "passwordsalt",
    "token",
    "credentials",
    "secret",
];

/// Mask a requester address for storage.
///
/// IPv4 keeps three octets (`a.b.c.xxx`). IPv6 keeps the first four
/// groups (`a:b:c:d::xxxx`). IPv4-mapped IPv6 is masked as IPv4.
/// Anything that does not parse becomes `unknown`.
pub fn mask_ip(ip: &str) -> String {
    let Ok(addr) = ip.trim().parse::<IpAddr>() else {
        return "unknown".to_string();
    };

    let addr = match addr {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(addr),
        v4 => v4,
    };

    match addr {
        IpAddr::V4(v4) => {
            let [a, b, c, _] = v4.octets();
            format!("{a}.{b}.{c}.xxx")
        }
        IpAddr::V6(v6) => {
            let s = v6.segments();
            format!("{:x}:{:x}:{:x}:{:x}::xxxx", s[0], s[1], s[2], s[3])
        }
    }
}

/// Remove credential-like keys from metadata, at any depth.
///
/// Keys match case-insensitively and ignoring `_` and `-`, so `password`,
/// `Password`, `password_hash`, and `passwordHash` are all caught.
pub fn sanitize_metadata(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| !is_sensitive(key))
                .map(|(key, v)| (key, sanitize_metadata(v)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_metadata).collect()),
        other => other,
    }
}

fn is_sensitive(key: &str) -> bool {
    let normalized = normalize_key(key);
    SENSITIVE_KEYS.contains(&normalized.as_str())
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}
