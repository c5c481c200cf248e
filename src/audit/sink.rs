//! Destinations for access log events.

use async_trait::async_trait;
use thiserror::Error;

use crate::audit::event::AccessLogEvent;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("log endpoint request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("log endpoint returned status {0}")]
    Status(u16),
}

/// Somewhere access log events can be delivered.
///
/// Callers never wait on a sink from the request path; the dispatcher's
/// worker does, and discards whatever error comes back.
#[async_trait]
pub trait AccessLogSink: Send + Sync {
    async fn record(&self, event: AccessLogEvent) -> Result<(), SinkError>;
}

/// POSTs each event as JSON to a logging endpoint.
#[derive(Clone)]
pub struct HttpLogSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpLogSink {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl AccessLogSink for HttpLogSink {
    async fn record(&self, event: AccessLogEvent) -> Result<(), SinkError> {
        let res = self.client.post(&self.endpoint).json(&event).send().await?;
        let status = res.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SinkError::Status(status.as_u16()))
        }
    }
}

/// Writes events to the tracing output under the `access_log` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

#[async_trait]
impl AccessLogSink for TracingLogSink {
    async fn record(&self, event: AccessLogEvent) -> Result<(), SinkError> {
        tracing::info!(
            target: "access_log",
            ip = %event.ip,
            url = %event.url,
            time = %event.time,
            status = event.status,
            "request"
        );
        Ok(())
    }
}
