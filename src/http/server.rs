//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the gatekeeper in front of every route
//! - Forward passed requests to the upstream application
//! - Wire up tower middleware (request timeout, tracing)
//! - Run background tasks (rate-limit sweep, config reload, access log)
//! - Shut down gracefully on signal

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        Request, StatusCode, Uri, Version,
    },
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use url::Url;

use crate::audit;
use crate::config::GatekeeperConfig;
use crate::gatekeeper::{now_millis, Gatekeeper};
use crate::http::middleware::gatekeeper_middleware;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid upstream {url:?}: {reason}")]
    Upstream { url: String, reason: &'static str },
}

/// Scheme and authority passed requests are rewritten to.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    scheme: Scheme,
    authority: Authority,
}

impl UpstreamTarget {
    /// Only plain `http` upstreams are supported; TLS belongs to the edge.
    pub fn parse(raw: &str) -> Result<Self, ServerError> {
        let invalid = |reason| ServerError::Upstream {
            url: raw.to_string(),
            reason,
        };
        let url = Url::parse(raw).map_err(|_| invalid("not a URL"))?;
        if url.scheme() != "http" {
            return Err(invalid("only http upstreams are supported"));
        }
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        Ok(Self {
            scheme: Scheme::HTTP,
            authority: Authority::from_str(&authority).map_err(|_| invalid("bad authority"))?,
        })
    }

    fn rewrite(&self, uri: &Uri) -> Result<Uri, axum::http::Error> {
        let mut parts = uri.clone().into_parts();
        parts.scheme = Some(self.scheme.clone());
        parts.authority = Some(self.authority.clone());
        if parts.path_and_query.is_none() {
            parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        Ok(Uri::from_parts(parts)?)
    }
}

/// Application state injected into the forwarding handler.
#[derive(Clone)]
pub struct AppState {
    pub client: Client<HttpConnector, Body>,
    pub upstream: UpstreamTarget,
}

/// Wrap any router so every request passes the gatekeeper first.
pub fn gatekeeper_router(gatekeeper: Arc<Gatekeeper>, inner: Router) -> Router {
    inner.layer(middleware::from_fn_with_state(gatekeeper, gatekeeper_middleware))
}

/// Edge server: gatekeeper in front of a pass-through proxy.
pub struct HttpServer {
    router: Router,
    config: GatekeeperConfig,
    gatekeeper: Arc<Gatekeeper>,
    audit_worker: Option<JoinHandle<()>>,
}

impl HttpServer {
    /// Create a server, starting the access log worker named by the config.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(config: GatekeeperConfig) -> Result<Self, ServerError> {
        let (dispatcher, worker) = audit::spawn_from_config(&config.access_log);
        let gatekeeper = Arc::new(Gatekeeper::new(&config, dispatcher));
        let mut server = Self::with_gatekeeper(config, gatekeeper)?;
        server.audit_worker = Some(worker);
        Ok(server)
    }

    /// Create a server around an existing gatekeeper.
    pub fn with_gatekeeper(
        config: GatekeeperConfig,
        gatekeeper: Arc<Gatekeeper>,
    ) -> Result<Self, ServerError> {
        let upstream = UpstreamTarget::parse(&config.upstream.url)?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let state = AppState { client, upstream };

        let router = Self::build_router(&config, gatekeeper.clone(), state);
        Ok(Self {
            router,
            config,
            gatekeeper,
            audit_worker: None,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(
        config: &GatekeeperConfig,
        gatekeeper: Arc<Gatekeeper>,
        state: AppState,
    ) -> Router {
        let app = Router::new().fallback(proxy_handler).with_state(state);
        gatekeeper_router(gatekeeper, app)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.upstream.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until `shutdown` fires, applying config updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatekeeperConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.url,
            "HTTP server starting"
        );

        let sweeper = spawn_sweeper(
            self.gatekeeper.clone(),
            Duration::from_secs(self.config.rate_limit.sweep_interval_secs),
        );

        let reload_gatekeeper = self.gatekeeper.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                reload_gatekeeper.reload(&config);
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        sweeper.abort();
        reloader.abort();
        // Dropping the gatekeeper closes the log queue; the worker drains and exits.
        drop(self.gatekeeper);
        if let Some(worker) = self.audit_worker {
            let _ = tokio::time::timeout(Duration::from_secs(2), worker).await;
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Periodically evict rate-limit records whose window has elapsed.
pub fn spawn_sweeper(gatekeeper: Arc<Gatekeeper>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            gatekeeper.sweep(now_millis());
        }
    })
}

/// Forward a passed request to the upstream application.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (mut parts, body) = request.into_parts();

    parts.uri = match state.upstream.rewrite(&parts.uri) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(error = %e, "Could not rewrite request URI");
            return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
        }
    };
    // The upstream connection is HTTP/1.1 regardless of what the client spoke.
    parts.version = Version::HTTP_11;

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(error = %e, "Upstream request failed");
            (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_parse() {
        let target = UpstreamTarget::parse("http://127.0.0.1:3000").unwrap();
        let uri = target.rewrite(&"/blog?page=2".parse().unwrap()).unwrap();
        assert_eq!(uri.to_string(), "http://127.0.0.1:3000/blog?page=2");

        assert!(UpstreamTarget::parse("https://app.internal").is_err());
        assert!(UpstreamTarget::parse("not a url").is_err());
    }
}
