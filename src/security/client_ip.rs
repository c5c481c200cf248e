//! Client address resolution.

use axum::http::HeaderMap;

/// Bucket shared by every client without a usable forwarding header.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// First entry of `x-forwarded-for`, trimmed. Falls back to [`UNKNOWN_CLIENT`].
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}
