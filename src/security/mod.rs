//! Security subsystem.
//!
//! The individual checks the gatekeeper sequences. Each one is a plain rule
//! object with no I/O; ordering lives in `gatekeeper`.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → blocked_paths.rs (PHP probes, suspicious substrings)
//!     → rate_limit.rs (per-IP fixed window, keyed by client_ip.rs)
//!     → access_control.rs (admin cookie)
//!     → redirect.rs (open-redirect guard)
//!     → Pass to upstream
//! ```
//!
//! # Design Decisions
//! - Malformed input lands on the deny/neutral branch, never a panic
//! - No rule contents or paths leak into responses

pub mod access_control;
pub mod blocked_paths;
pub mod client_ip;
pub mod rate_limit;
pub mod redirect;

pub use access_control::{cookie_value, AdminGuard};
pub use blocked_paths::BlockedPathRules;
pub use client_ip::{client_ip, UNKNOWN_CLIENT};
pub use rate_limit::{FixedWindowLimiter, InMemoryRateLimitStore, RateLimitRecord, RateLimitStore};
pub use redirect::{origin_host, RedirectGuard, RedirectTarget};
