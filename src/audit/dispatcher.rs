use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

use crate::audit::event::AccessLogEvent;
use crate::audit::sink::AccessLogSink;
use crate::observability::metrics;

/// Cheap, cloneable handle that queues access log events without waiting.
///
/// [`dispatch`](Self::dispatch) is synchronous and never blocks: when the
/// queue is full or the worker has gone away, the event is dropped.
#[derive(Clone, Debug)]
pub struct AccessLogDispatcher {
    tx: mpsc::Sender<AccessLogEvent>,
}

impl AccessLogDispatcher {
    /// Bare queue without a worker. The caller drains the receiver.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<AccessLogEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Queue plus a background worker delivering into `sink`.
    ///
    /// Up to `max_in_flight` deliveries run concurrently, each bounded by
    /// `timeout`. The worker exits once every dispatcher clone has been
    /// dropped, the queue is drained and in-flight deliveries have settled.
    pub fn spawn(
        sink: Arc<dyn AccessLogSink>,
        capacity: usize,
        max_in_flight: usize,
        timeout: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (dispatcher, rx) = Self::channel(capacity);
        let handle = tokio::spawn(run_worker(rx, sink, max_in_flight.max(1), timeout));
        (dispatcher, handle)
    }

    pub fn dispatch(&self, event: AccessLogEvent) {
        if let Err(err) = self.tx.try_send(event) {
            let reason = match err {
                mpsc::error::TrySendError::Full(_) => "queue_full",
                mpsc::error::TrySendError::Closed(_) => "closed",
            };
            metrics::record_access_log_dropped(reason);
            tracing::debug!(reason, "Access log event dropped");
        }
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<AccessLogEvent>,
    sink: Arc<dyn AccessLogSink>,
    max_in_flight: usize,
    timeout: Duration,
) {
    let permits = Arc::new(Semaphore::new(max_in_flight));
    let mut in_flight = JoinSet::new();

    while let Some(event) = rx.recv().await {
        // Blocks while every permit is taken; the queue holds the backlog.
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        while in_flight.try_join_next().is_some() {}

        let sink = sink.clone();
        in_flight.spawn(async move {
            deliver(sink.as_ref(), event, timeout).await;
            drop(permit);
        });
    }

    while in_flight.join_next().await.is_some() {}
    tracing::debug!("Access log worker stopped");
}

async fn deliver(sink: &dyn AccessLogSink, event: AccessLogEvent, timeout: Duration) {
    match tokio::time::timeout(timeout, sink.record(event)).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            metrics::record_access_log_dropped("sink_error");
            tracing::debug!(error = %err, "Access log delivery failed");
        }
        Err(_) => {
            metrics::record_access_log_dropped("timeout");
            tracing::debug!(
                timeout_ms = timeout.as_millis() as u64,
                "Access log delivery timed out"
            );
        }
    }
}
