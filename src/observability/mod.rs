//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gatekeeper, dispatcher, server produce:
//!     → logging.rs (structured tracing events, pretty or JSON)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout log aggregation
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Cookie values and rule lists are never logged
//! - Metric updates are cheap enough for the per-request path

pub mod logging;
pub mod metrics;
