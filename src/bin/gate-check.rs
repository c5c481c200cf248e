use std::path::PathBuf;

use axum::body::Body;
use axum::http::Request;
use clap::Parser;
use serde::Serialize;

use edge_gatekeeper::audit::AccessLogDispatcher;
use edge_gatekeeper::config::{load_config, GatekeeperConfig};
use edge_gatekeeper::gatekeeper::{Decision, Gatekeeper};

#[derive(Parser)]
#[command(name = "gate-check")]
#[command(about = "Evaluate one request against gatekeeper rules offline", long_about = None)]
struct Cli {
    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path and query to evaluate, e.g. "/redirect?to=https://example.org".
    #[arg(short, long)]
    url: String,

    /// Client address placed in x-forwarded-for.
    #[arg(long)]
    ip: Option<String>,

    /// Raw Cookie header, e.g. "admin_auth=true".
    #[arg(long)]
    cookie: Option<String>,

    /// Host header of the request.
    #[arg(long, default_value = "localhost")]
    host: String,
}

#[derive(Serialize)]
struct Report<'a> {
    outcome: &'static str,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
    excluded: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatekeeperConfig::default(),
    };

    let mut builder = Request::builder().uri(cli.url.as_str()).header("host", cli.host.as_str());
    if let Some(ip) = &cli.ip {
        builder = builder.header("x-forwarded-for", ip.as_str());
    }
    if let Some(cookie) = &cli.cookie {
        builder = builder.header("cookie", cookie.as_str());
    }
    let request = builder.body(Body::empty())?;

    // Nothing drains the queue; the one event this run produces is discarded.
    let (audit, _events) = AccessLogDispatcher::channel(1);
    let gatekeeper = Gatekeeper::new(&config, audit);

    let excluded = gatekeeper.is_excluded(request.uri().path());
    let decision = if excluded {
        Decision::Pass
    } else {
        gatekeeper.evaluate(&request)
    };

    let location = match &decision {
        Decision::Redirect { location, .. } => Some(location.as_str()),
        _ => None,
    };
    let report = Report {
        outcome: decision.outcome(),
        status: decision.status().as_u16(),
        location,
        reason: decision.reason(),
        excluded,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
