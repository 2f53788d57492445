//! Opaque page tokens for log listings.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use linkgate_core::types::pagination::LogCursor;

/// Encode a cursor as a URL-safe token.
pub fn encode_page_token(cursor: &LogCursor) -> String {
    // A struct of a timestamp and a string always serializes.
    let json = serde_json::to_vec(cursor).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode a token produced by [`encode_page_token`].
///
/// Returns `None` for anything malformed; callers restart from the top.
pub fn decode_page_token(token: &str) -> Option<LogCursor> {
    let bytes = URL_SAFE_NO_PAD.decode(token.trim().trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}
