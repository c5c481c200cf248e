//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gatekeeper.
//! All types derive Serde traits for deserialization from config files, and
//! every section has defaults so an empty file yields the stock deployment.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge gatekeeper.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatekeeperConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The application that passed requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Per-IP fixed window rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Suspicious path rules.
    pub blocked_paths: BlockedPathsConfig,

    /// Cookie protection for the admin area.
    pub admin: AdminConfig,

    /// Open-redirect guard for the redirect proxy endpoint.
    pub redirect_guard: RedirectGuardConfig,

    /// Paths the host layer never hands to the gatekeeper.
    pub exclusions: ExclusionsConfig,

    /// Fire-and-forget access log delivery.
    pub access_log: AccessLogConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream application configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the protected application (e.g., "http://127.0.0.1:3000").
    pub url: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests allowed per client IP within one window.
    pub max_requests: u32,

    /// Window length in milliseconds.
    pub window_ms: u64,

    /// How often stale records are evicted, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 300,
            window_ms: 60_000,
            sweep_interval_secs: 60,
        }
    }
}

/// Blocked path rules.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockedPathsConfig {
    /// Reject paths ending in `.php` or containing `.php/` (case-insensitive).
    pub block_php: bool,

    /// Case-sensitive substrings that cause a 403 anywhere in the path.
    pub substrings: Vec<String>,
}

impl Default for BlockedPathsConfig {
    fn default() -> Self {
        Self {
            block_php: true,
            substrings: default_blocked_substrings(),
        }
    }
}

fn default_blocked_substrings() -> Vec<String> {
    [
        ".env",
        ".env.local",
        ".env.production",
        ".git",
        ".gitignore",
        ".htaccess",
        ".htpasswd",
        "wp-admin",
        "wp-config",
        "wp-login",
        "xmlrpc",
        "web.config",
        "dump.sql",
        "database.sql",
        "vendor",
        "node_modules",
        "storage",
        "logs",
        "backup",
        "tmp",
        ".aws/credentials",
        ".aws/config",
        ".ssh/id_rsa",
        ".docker/config.json",
        ".DS_Store",
        "phpinfo",
        "config.json.bak",
        "server-status",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Admin area protection.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Paths starting with this prefix require the admin cookie.
    pub path_prefix: String,

    /// Name of the session cookie.
    pub cookie_name: String,

    /// Exact value that grants access.
    pub cookie_value: String,

    /// Where unauthenticated visitors are sent.
    pub login_redirect: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            path_prefix: "/admin".to_string(),
            cookie_name: "admin_auth".to_string(),
            cookie_value: "true".to_string(),
            login_redirect: "/".to_string(),
        }
    }
}

/// Open-redirect guard.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RedirectGuardConfig {
    /// Exact path of the redirect proxy endpoint.
    pub path: String,

    /// Query parameter carrying the target URL.
    pub param: String,

    /// Where requests with an unsafe target are sent.
    pub fallback: String,
}

impl Default for RedirectGuardConfig {
    fn default() -> Self {
        Self {
            path: "/redirect".to_string(),
            param: "to".to_string(),
            fallback: "/".to_string(),
        }
    }
}

/// Paths that bypass the gatekeeper entirely.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExclusionsConfig {
    /// Path prefixes that skip every check and produce no access log.
    pub prefixes: Vec<String>,
}

impl Default for ExclusionsConfig {
    fn default() -> Self {
        Self {
            prefixes: vec![
                "/_next/static".to_string(),
                "/_next/image".to_string(),
                "/favicon.ico".to_string(),
                // The log endpoint itself, or every log call would log again.
                "/api/log".to_string(),
            ],
        }
    }
}

/// Access log delivery.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessLogConfig {
    /// HTTP endpoint receiving `{ip, url, time, status}` JSON bodies.
    /// When unset, events are written to the tracing output instead.
    pub endpoint: Option<String>,

    /// Per-event delivery timeout in milliseconds.
    pub timeout_ms: u64,

    /// Events buffered before new ones are dropped.
    pub queue_capacity: usize,

    /// Deliveries allowed in flight at once.
    pub max_in_flight: usize,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: 2_000,
            queue_capacity: 1_024,
            max_in_flight: 64,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
