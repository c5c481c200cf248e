//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use edge_gatekeeper::audit::AccessLogEvent;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a mock upstream on an ephemeral port that answers every request
/// with `200` and a fixed body.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response_str = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    response.len(),
                    response
                );
                let _ = socket.write_all(response_str.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Events received by a [`start_log_collector`] endpoint.
pub type Collected = Arc<Mutex<Vec<AccessLogEvent>>>;

/// Start an HTTP endpoint that stores every access log event POSTed to it.
pub async fn start_log_collector() -> (SocketAddr, Collected) {
    let collected: Collected = Arc::default();
    let app = Router::new()
        .route("/api/log", post(collect))
        .with_state(collected.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, collected)
}

async fn collect(
    State(collected): State<Collected>,
    Json(event): Json<AccessLogEvent>,
) -> StatusCode {
    collected.lock().unwrap().push(event);
    StatusCode::NO_CONTENT
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Poll until `collected` holds at least `n` events or two seconds pass.
pub async fn wait_for_events(collected: &Collected, n: usize) -> Vec<AccessLogEvent> {
    for _ in 0..100 {
        {
            let events = collected.lock().unwrap();
            if events.len() >= n {
                return events.clone();
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    collected.lock().unwrap().clone()
}

/// Client that neither follows redirects nor uses a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}
