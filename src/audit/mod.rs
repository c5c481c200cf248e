//! Fire-and-forget access logging.
//!
//! # Data Flow
//! ```text
//! Gatekeeper decision
//!     → event.rs (AccessLogEvent {ip, url, time, status})
//!     → dispatcher.rs (try_send onto bounded queue, never awaited)
//!     → background worker (bounded concurrency, per-event timeout)
//!     → sink.rs (HTTP endpoint, or tracing output)
//! ```
//!
//! # Design Decisions
//! - Delivery failures are counted and discarded, never surfaced
//! - A full queue drops new events rather than slowing requests

pub mod dispatcher;
pub mod event;
pub mod sink;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::AccessLogConfig;

pub use dispatcher::AccessLogDispatcher;
pub use event::AccessLogEvent;
pub use sink::{AccessLogSink, HttpLogSink, SinkError, TracingLogSink};

/// Pick the sink named by the configuration and start its worker.
pub fn spawn_from_config(config: &AccessLogConfig) -> (AccessLogDispatcher, JoinHandle<()>) {
    let sink: Arc<dyn AccessLogSink> = match &config.endpoint {
        Some(endpoint) => {
            tracing::info!(endpoint = %endpoint, "Access log delivered over HTTP");
            Arc::new(HttpLogSink::new(endpoint.clone()))
        }
        None => {
            tracing::info!("No access log endpoint configured, logging to tracing output");
            Arc::new(TracingLogSink)
        }
    };
    AccessLogDispatcher::spawn(
        sink,
        config.queue_capacity,
        config.max_in_flight,
        Duration::from_millis(config.timeout_ms),
    )
}
