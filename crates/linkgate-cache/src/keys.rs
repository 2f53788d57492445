//! Key builders for everything LinkGate keeps in the key-value store.

/// Key of the attempt record for one requester against one resource.
///
/// Rendered as `resourceId:requesterIp`, the key shape existing attempt
/// tables use, so records written by other readers stay visible.
pub fn access_attempt(resource_id: &str, requester_ip: &str) -> String {
    format!("{resource_id}:{requester_ip}")
}
