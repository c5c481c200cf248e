use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One access log record, emitted once per gatekeeper decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLogEvent {
    pub ip: String,
    /// Path and query as seen by the gatekeeper.
    pub url: String,
    /// ISO-8601 UTC timestamp with millisecond precision.
    pub time: String,
    /// Status of the response the client receives (200 for pass-through).
    pub status: u16,
}

impl AccessLogEvent {
    pub fn new(ip: impl Into<String>, url: impl Into<String>, now_ms: u64, status: u16) -> Self {
        Self {
            ip: ip.into(),
            url: url.into(),
            time: format_millis(now_ms),
            status,
        }
    }
}

fn format_millis(now_ms: u64) -> String {
    i64::try_from(now_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
