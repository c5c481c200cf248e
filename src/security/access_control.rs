//! Cookie based protection for the admin area.

use axum::http::{header, HeaderMap};

use crate::config::AdminConfig;

/// Value of the named cookie across every `Cookie` header, first match wins.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| k.trim() == name)
        .map(|(_, v)| v.trim())
}

/// Admin area rule.
#[derive(Debug, Clone)]
pub struct AdminGuard {
    path_prefix: String,
    cookie_name: String,
    cookie_value: String,
    login_redirect: String,
}

impl AdminGuard {
    pub fn from_config(config: &AdminConfig) -> Self {
        Self {
            path_prefix: config.path_prefix.clone(),
            cookie_name: config.cookie_name.clone(),
            cookie_value: config.cookie_value.clone(),
            login_redirect: config.login_redirect.clone(),
        }
    }

    pub fn protects(&self, path: &str) -> bool {
        path.starts_with(&self.path_prefix)
    }

    /// The cookie must carry exactly the configured value.
    pub fn is_authorized(&self, headers: &HeaderMap) -> bool {
        cookie_value(headers, &self.cookie_name) == Some(self.cookie_value.as_str())
    }

    pub fn login_redirect(&self) -> &str {
        &self.login_redirect
    }
}
