//! Open-redirect guard for the redirect proxy endpoint.
//!
//! A target is safe only when it is an absolute http(s) URL pointing at a
//! host other than the one serving the request. Anything that fails to parse
//! counts as unsafe.

use axum::http::{header, Request};
use url::Url;

use crate::config::RedirectGuardConfig;

/// A `to` parameter that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    pub url: Url,
}

impl RedirectTarget {
    /// Validate `raw` against the requesting origin's host (`host[:port]`).
    pub fn parse(raw: &str, origin_host: Option<&str>) -> Option<Self> {
        let url = Url::parse(raw).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        let target_host = authority(&url)?;
        if let Some(origin) = origin_host {
            if target_host.eq_ignore_ascii_case(origin) {
                return None;
            }
        }
        Some(Self { url })
    }
}

/// Host plus port, with 80 and 443 omitted.
///
/// The edge sits behind TLS termination, so the scheme the client used is
/// unknown and both default ports are treated as implicit.
fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(80) | Some(443) | None => host.to_string(),
        Some(port) => format!("{}:{}", host, port),
    })
}

/// Host the request was addressed to: `Host` header, then the URI authority.
///
/// Normalized the same way as redirect targets, so `example.com:80` and
/// `example.com` compare equal. An unparsable host yields `None`.
pub fn origin_host<B>(req: &Request<B>) -> Option<String> {
    let raw = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.uri().authority().map(|a| a.as_str().to_string()))?;
    let url = Url::parse(&format!("http://{}", raw)).ok()?;
    authority(&url)
}

/// Redirect endpoint rule.
#[derive(Debug, Clone)]
pub struct RedirectGuard {
    path: String,
    param: String,
    fallback: String,
}

impl RedirectGuard {
    pub fn from_config(config: &RedirectGuardConfig) -> Self {
        Self {
            path: config.path.clone(),
            param: config.param.clone(),
            fallback: config.fallback.clone(),
        }
    }

    pub fn guards(&self, path: &str) -> bool {
        path == self.path
    }

    /// Raw target parameter, empty when absent.
    pub fn target_param(&self, query: Option<&str>) -> String {
        query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .find(|(k, _)| k == self.param.as_str())
                    .map(|(_, v)| v.into_owned())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    /// True when the request's target parameter is safe to follow.
    pub fn is_safe<B>(&self, req: &Request<B>) -> bool {
        let raw = self.target_param(req.uri().query());
        let origin = origin_host(req);
        RedirectTarget::parse(&raw, origin.as_deref()).is_some()
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(uri: &str, host: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("host", host)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_rejects_non_http_schemes() {
        assert!(RedirectTarget::parse("javascript:alert(1)", Some("example.com")).is_none());
        assert!(RedirectTarget::parse("data:text/html,hi", Some("example.com")).is_none());
        assert!(RedirectTarget::parse("ftp://files.example.org/", Some("example.com")).is_none());
    }

    #[test]
    fn test_rejects_unparsable_and_relative() {
        assert!(RedirectTarget::parse("", Some("example.com")).is_none());
        assert!(RedirectTarget::parse("/local/page", Some("example.com")).is_none());
        assert!(RedirectTarget::parse("//evil.test/", Some("example.com")).is_none());
        assert!(RedirectTarget::parse("http://", Some("example.com")).is_none());
    }

    #[test]
    fn test_rejects_same_host() {
        assert!(RedirectTarget::parse("https://example.com/inside", Some("example.com")).is_none());
        assert!(RedirectTarget::parse("http://EXAMPLE.com/", Some("example.com")).is_none());
    }

    #[test]
    fn test_port_is_part_of_host() {
        assert!(RedirectTarget::parse("http://localhost:3000/x", Some("localhost:3000")).is_none());
        assert!(RedirectTarget::parse("http://localhost:4000/x", Some("localhost:3000")).is_some());
        assert!(RedirectTarget::parse("https://example.com:443/", Some("example.com")).is_none());
        assert!(RedirectTarget::parse("http://example.com:443/", Some("example.com")).is_none());
    }

    #[test]
    fn test_origin_default_port_is_implicit() {
        let guard = RedirectGuard::from_config(&RedirectGuardConfig::default());

        let req = request("/redirect?to=http://example.com/x", "example.com:80");
        assert_eq!(origin_host(&req).as_deref(), Some("example.com"));
        assert!(!guard.is_safe(&req));

        let req = request("/redirect?to=https://example.com/x", "example.com:443");
        assert!(!guard.is_safe(&req));

        let req = request("/redirect?to=https://Example.COM:443/x", "EXAMPLE.com");
        assert!(!guard.is_safe(&req));

        let req = request("/redirect?to=http://example.com:8080/x", "example.com:80");
        assert!(guard.is_safe(&req));
    }

    #[test]
    fn test_accepts_external_http() {
        assert!(RedirectTarget::parse("https://www.google.com/", Some("example.com")).is_some());
        assert!(RedirectTarget::parse("http://example.org/", Some("example.com")).is_some());
        assert!(RedirectTarget::parse("https://www.google.com/", None).is_some());
    }

    #[test]
    fn test_guard_reads_encoded_param() {
        let guard = RedirectGuard::from_config(&RedirectGuardConfig::default());
        let req = request("/redirect?to=https%3A%2F%2Fwww.google.com%2F&x=1", "example.com");
        assert!(guard.is_safe(&req));

        let req = request("/redirect?to=https://example.com/inside", "example.com");
        assert!(!guard.is_safe(&req));

        let req = request("/redirect", "example.com");
        assert!(!guard.is_safe(&req));
    }

    #[test]
    fn test_guard_path_is_exact() {
        let guard = RedirectGuard::from_config(&RedirectGuardConfig::default());
        assert!(guard.guards("/redirect"));
        assert!(!guard.guards("/redirect/"));
        assert!(!guard.guards("/redirects"));
    }
}
