//! Per-request gatekeeping.
//!
//! Every request not excluded by the host layer is evaluated once, in a fixed
//! order where the first failing check wins:
//!
//! ```text
//! PhpProbe → BlockedPath → RateLimit → AdminAuth → RedirectGuard → Pass
//!   403         403           429        302           302          200
//! ```
//!
//! Each outcome, pass included, queues exactly one access log event before
//! returning. Evaluation itself does no I/O.

pub mod decision;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwap;
use axum::http::Request;

use crate::audit::{AccessLogDispatcher, AccessLogEvent};
use crate::config::{GatekeeperConfig, RateLimitConfig};
use crate::observability::metrics;
use crate::security::{
    client_ip, AdminGuard, BlockedPathRules, FixedWindowLimiter, RateLimitStore, RedirectGuard,
};

pub use decision::{BlockReason, Decision, RedirectReason};

/// One step of the evaluation chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    PhpProbe,
    BlockedPath,
    RateLimit,
    AdminAuth,
    RedirectGuard,
}

/// Evaluation order. Reordering changes which status a request gets.
pub const CHECK_ORDER: [Check; 5] = [
    Check::PhpProbe,
    Check::BlockedPath,
    Check::RateLimit,
    Check::AdminAuth,
    Check::RedirectGuard,
];

/// Immutable rule set built from configuration; swapped wholesale on reload.
#[derive(Debug, Clone)]
pub struct GateRules {
    pub blocked: BlockedPathRules,
    pub rate_limit: RateLimitConfig,
    pub admin: AdminGuard,
    pub redirect: RedirectGuard,
    pub exclusions: Vec<String>,
}

impl GateRules {
    pub fn from_config(config: &GatekeeperConfig) -> Self {
        Self {
            blocked: BlockedPathRules::from_config(&config.blocked_paths),
            rate_limit: config.rate_limit.clone(),
            admin: AdminGuard::from_config(&config.admin),
            redirect: RedirectGuard::from_config(&config.redirect_guard),
            exclusions: config.exclusions.prefixes.clone(),
        }
    }
}

/// Request gatekeeper: rule set, rate-limit table and access log handle.
pub struct Gatekeeper {
    rules: ArcSwap<GateRules>,
    limiter: FixedWindowLimiter,
    audit: AccessLogDispatcher,
}

impl Gatekeeper {
    /// Gatekeeper with a process-local rate-limit table.
    pub fn new(config: &GatekeeperConfig, audit: AccessLogDispatcher) -> Self {
        Self::with_limiter(config, FixedWindowLimiter::in_memory(), audit)
    }

    /// Gatekeeper over a caller-supplied rate-limit store.
    pub fn with_store(
        config: &GatekeeperConfig,
        store: Box<dyn RateLimitStore>,
        audit: AccessLogDispatcher,
    ) -> Self {
        Self::with_limiter(config, FixedWindowLimiter::new(store), audit)
    }

    fn with_limiter(
        config: &GatekeeperConfig,
        limiter: FixedWindowLimiter,
        audit: AccessLogDispatcher,
    ) -> Self {
        Self {
            rules: ArcSwap::from_pointee(GateRules::from_config(config)),
            limiter,
            audit,
        }
    }

    /// Swap in rules from a new configuration. Rate-limit counters are kept.
    pub fn reload(&self, config: &GatekeeperConfig) {
        let rules = GateRules::from_config(config);
        tracing::info!(
            blocked_substrings = rules.blocked.len(),
            max_requests = rules.rate_limit.max_requests,
            window_ms = rules.rate_limit.window_ms,
            "Gatekeeper rules reloaded"
        );
        self.rules.store(Arc::new(rules));
    }

    /// Paths the host layer hands straight through without evaluation.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.rules
            .load()
            .exclusions
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    pub fn evaluate<B>(&self, req: &Request<B>) -> Decision {
        self.evaluate_at(req, now_millis())
    }

    /// Evaluate `req` as if it arrived at `now` (ms since the Unix epoch).
    pub fn evaluate_at<B>(&self, req: &Request<B>, now: u64) -> Decision {
        let rules = self.rules.load();
        let ip = client_ip(req.headers());

        let decision = CHECK_ORDER
            .iter()
            .find_map(|check| self.run_check(*check, &rules, req, &ip, now))
            .unwrap_or(Decision::Pass);

        self.record(req, ip, now, &decision);
        decision
    }

    fn run_check<B>(
        &self,
        check: Check,
        rules: &GateRules,
        req: &Request<B>,
        ip: &str,
        now: u64,
    ) -> Option<Decision> {
        let path = req.uri().path();
        match check {
            Check::PhpProbe => rules
                .blocked
                .is_php_probe(path)
                .then(|| Decision::block(BlockReason::PhpProbe)),
            Check::BlockedPath => rules
                .blocked
                .matches_substring(path)
                .then(|| Decision::block(BlockReason::BlockedPath)),
            Check::RateLimit => {
                let limited =
                    rules.rate_limit.enabled && !self.limiter.check(ip, now, &rules.rate_limit);
                limited.then(|| Decision::block(BlockReason::RateLimited))
            }
            Check::AdminAuth => {
                let denied =
                    rules.admin.protects(path) && !rules.admin.is_authorized(req.headers());
                denied.then(|| {
                    Decision::redirect(
                        rules.admin.login_redirect(),
                        RedirectReason::AdminUnauthenticated,
                    )
                })
            }
            Check::RedirectGuard => {
                let unsafe_target = rules.redirect.guards(path) && !rules.redirect.is_safe(req);
                unsafe_target.then(|| {
                    Decision::redirect(
                        rules.redirect.fallback(),
                        RedirectReason::UnsafeRedirectTarget,
                    )
                })
            }
        }
    }

    fn record<B>(&self, req: &Request<B>, ip: String, now: u64, decision: &Decision) {
        let status = decision.status().as_u16();
        let url = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| req.uri().path());

        match decision {
            Decision::Pass => tracing::debug!(ip = %ip, url = %url, status, "Request passed"),
            Decision::Block { reason } => tracing::warn!(
                ip = %ip,
                path = %req.uri().path(),
                status,
                reason = reason.as_str(),
                "Request blocked"
            ),
            Decision::Redirect { reason, .. } => tracing::info!(
                ip = %ip,
                path = %req.uri().path(),
                status,
                reason = reason.as_str(),
                "Request redirected"
            ),
        }
        metrics::record_decision(decision.outcome(), status);

        self.audit.dispatch(AccessLogEvent::new(ip, url, now, status));
    }

    /// Evict expired rate-limit records. Returns how many were removed.
    pub fn sweep(&self, now: u64) -> usize {
        let removed = self.limiter.sweep(now, &self.rules.load().rate_limit);
        metrics::record_rate_limit_entries(self.limiter.tracked_clients());
        removed
    }

    pub fn tracked_clients(&self) -> usize {
        self.limiter.tracked_clients()
    }
}

/// Wall clock in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use tokio::sync::mpsc;

    fn gatekeeper(config: &GatekeeperConfig) -> (Gatekeeper, mpsc::Receiver<AccessLogEvent>) {
        let (audit, rx) = AccessLogDispatcher::channel(4096);
        (Gatekeeper::new(config, audit), rx)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("host", "example.com")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_check_order_is_fixed() {
        assert_eq!(
            CHECK_ORDER,
            [
                Check::PhpProbe,
                Check::BlockedPath,
                Check::RateLimit,
                Check::AdminAuth,
                Check::RedirectGuard,
            ]
        );
    }

    #[test]
    fn test_pass_logs_200_with_query() {
        let (gk, mut rx) = gatekeeper(&GatekeeperConfig::default());
        assert_eq!(gk.evaluate_at(&get("/blog/post?ref=home"), 0), Decision::Pass);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.ip, "203.0.113.9");
        assert_eq!(event.url, "/blog/post?ref=home");
        assert_eq!(event.status, 200);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_blocked_path_does_not_touch_limiter() {
        let (gk, _rx) = gatekeeper(&GatekeeperConfig::default());
        gk.evaluate_at(&get("/.git/config"), 0);
        gk.evaluate_at(&get("/wp-login.php"), 0);
        assert_eq!(gk.tracked_clients(), 0);
    }

    #[test]
    fn test_rate_limit_disabled() {
        let mut config = GatekeeperConfig::default();
        config.rate_limit.enabled = false;
        config.rate_limit.max_requests = 1;
        let (gk, _rx) = gatekeeper(&config);
        for _ in 0..5 {
            assert!(gk.evaluate_at(&get("/"), 0).is_pass());
        }
    }

    #[test]
    fn test_reload_keeps_counters() {
        let mut config = GatekeeperConfig::default();
        config.rate_limit.max_requests = 2;
        let (gk, _rx) = gatekeeper(&config);
        assert!(gk.evaluate_at(&get("/a"), 0).is_pass());
        assert!(gk.evaluate_at(&get("/a"), 1).is_pass());

        config.blocked_paths.substrings.push("/private".into());
        gk.reload(&config);

        assert_eq!(
            gk.evaluate_at(&get("/private/x"), 2).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            gk.evaluate_at(&get("/a"), 3).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_exclusions() {
        let (gk, _rx) = gatekeeper(&GatekeeperConfig::default());
        assert!(gk.is_excluded("/api/log"));
        assert!(gk.is_excluded("/_next/static/chunks/app.js"));
        assert!(gk.is_excluded("/favicon.ico"));
        assert!(!gk.is_excluded("/api/posts"));
    }

    #[test]
    fn test_sweep_drops_idle_clients() {
        let (gk, _rx) = gatekeeper(&GatekeeperConfig::default());
        gk.evaluate_at(&get("/"), 0);
        assert_eq!(gk.tracked_clients(), 1);
        assert_eq!(gk.sweep(59_999), 0);
        assert_eq!(gk.sweep(60_000), 1);
        assert_eq!(gk.tracked_clients(), 0);
    }
}
