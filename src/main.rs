//! Edge gatekeeper server.
//!
//! ```text
//!     Client ──▶ listener ──▶ trace/timeout ──▶ gatekeeper ──▶ proxy ──▶ Application
//!                                                  │
//!                                                  ├─ 403 / 429 / 302
//!                                                  └─▶ access log queue ──▶ log sink
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use edge_gatekeeper::config::{load_config, watcher::ConfigWatcher, GatekeeperConfig};
use edge_gatekeeper::http::HttpServer;
use edge_gatekeeper::lifecycle::{shutdown_on_signal, Shutdown};
use edge_gatekeeper::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "edge-gatekeeper")]
#[command(about = "Request gatekeeper in front of a web application", long_about = None)]
struct Args {
    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Do not reload rules when the config file changes.
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let file_config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatekeeperConfig::default(),
    };
    let mut config = file_config.clone();
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability);
    tracing::info!("edge-gatekeeper v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.url,
        max_requests = config.rate_limit.max_requests,
        window_ms = config.rate_limit.window_ms,
        blocked_substrings = config.blocked_paths.substrings.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Hot reload of rules; the watcher handle must outlive the server.
    let (_idle_tx, idle_rx) = mpsc::unbounded_channel();
    let (_watcher, config_updates) = match (&args.config, args.no_watch) {
        (Some(path), false) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            match watcher.with_current(file_config).run() {
                Ok(handle) => (Some(handle), updates),
                Err(e) => {
                    tracing::warn!(error = %e, "Config watcher unavailable, rules are static");
                    (None, idle_rx)
                }
            }
        }
        _ => (None, idle_rx),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
