//! Configuration validation.
//!
//! Serde handles syntax; this module checks values. Validation is a pure
//! function returning every problem found, not just the first.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatekeeperConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: expected an absolute http(s) URL, got {value:?}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{field}: must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field}: must start with '/', got {value:?}")]
    NotAbsolutePath { field: &'static str, value: String },

    #[error("blocked_paths.substrings: entry {0} is empty and would block every request")]
    EmptyBlockedSubstring(usize),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatekeeperConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    check_http_url(&mut errors, "upstream.url", &config.upstream.url);
    if config.upstream.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "upstream.request_timeout_secs",
        });
    }

    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::Zero {
            field: "rate_limit.max_requests",
        });
    }
    if config.rate_limit.window_ms == 0 {
        errors.push(ValidationError::Zero {
            field: "rate_limit.window_ms",
        });
    }
    if config.rate_limit.sweep_interval_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "rate_limit.sweep_interval_secs",
        });
    }

    for (i, s) in config.blocked_paths.substrings.iter().enumerate() {
        if s.is_empty() {
            errors.push(ValidationError::EmptyBlockedSubstring(i));
        }
    }

    check_path(&mut errors, "admin.path_prefix", &config.admin.path_prefix);
    check_path(&mut errors, "admin.login_redirect", &config.admin.login_redirect);
    check_path(&mut errors, "redirect_guard.path", &config.redirect_guard.path);
    check_path(&mut errors, "redirect_guard.fallback", &config.redirect_guard.fallback);
    for prefix in &config.exclusions.prefixes {
        check_path(&mut errors, "exclusions.prefixes", prefix);
    }

    if let Some(endpoint) = &config.access_log.endpoint {
        check_http_url(&mut errors, "access_log.endpoint", endpoint);
    }
    if config.access_log.queue_capacity == 0 {
        errors.push(ValidationError::Zero {
            field: "access_log.queue_capacity",
        });
    }
    if config.access_log.max_in_flight == 0 {
        errors.push(ValidationError::Zero {
            field: "access_log.max_in_flight",
        });
    }
    if config.access_log.timeout_ms == 0 {
        errors.push(ValidationError::Zero {
            field: "access_log.timeout_ms",
        });
    }

    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress { field, value: value.to_string() });
    }
}

fn check_http_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    let ok = Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false);
    if !ok {
        errors.push(ValidationError::InvalidUrl { field, value: value.to_string() });
    }
}

fn check_path(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if !value.starts_with('/') {
        errors.push(ValidationError::NotAbsolutePath { field, value: value.to_string() });
    }
}
