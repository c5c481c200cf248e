//! Edge request gatekeeper.
//!
//! Evaluates every inbound request before the application sees it: PHP
//! probes and suspicious paths are refused, clients are rate limited per IP,
//! the admin area requires its session cookie, and the redirect endpoint only
//! follows off-site http(s) targets. Each decision is access-logged without
//! waiting on the log sink.

pub mod audit;
pub mod config;
pub mod gatekeeper;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::GatekeeperConfig;
pub use gatekeeper::{Decision, Gatekeeper};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
