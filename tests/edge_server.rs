//! End-to-end tests: gatekeeper server in front of a mock upstream.

use std::net::SocketAddr;
use std::time::Duration;

use edge_gatekeeper::config::GatekeeperConfig;
use edge_gatekeeper::http::HttpServer;
use edge_gatekeeper::lifecycle::Shutdown;
use tokio::sync::mpsc;

mod common;

struct Running {
    addr: SocketAddr,
    updates: mpsc::UnboundedSender<GatekeeperConfig>,
    shutdown: Shutdown,
}

async fn start(config: GatekeeperConfig) -> Running {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    Running {
        addr,
        updates,
        shutdown,
    }
}

async fn config_with_upstream(body: &'static str) -> GatekeeperConfig {
    let upstream = common::start_mock_backend(body).await;
    let mut config = GatekeeperConfig::default();
    config.upstream.url = format!("http://{}", upstream);
    config
}

#[tokio::test]
async fn test_pass_through_and_access_log() {
    let (collector, events) = common::start_log_collector().await;
    let mut config = config_with_upstream("hello from app").await;
    config.access_log.endpoint = Some(format!("http://{}/api/log", collector));
    let server = start(config).await;
    let client = common::client();

    let res = client
        .get(format!("http://{}/blog/post?draft=0", server.addr))
        .header("x-forwarded-for", "203.0.113.50, 10.0.0.1")
        .send()
        .await
        .expect("gatekeeper unreachable");
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "hello from app");

    let res = client
        .get(format!("http://{}/.env", server.addr))
        .header("x-forwarded-for", "203.0.113.50")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);
    assert_eq!(res.text().await.unwrap(), "Forbidden");

    let res = client
        .get(format!("http://{}/admin", server.addr))
        .header("x-forwarded-for", "203.0.113.50")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 302);
    assert_eq!(res.headers()["location"], "/");

    let mut seen = common::wait_for_events(&events, 3).await;
    assert_eq!(seen.len(), 3);
    seen.sort_by_key(|e| e.status);
    assert!(seen.iter().all(|e| e.ip == "203.0.113.50"));
    assert_eq!(seen[0].url, "/blog/post?draft=0");
    assert_eq!(seen[0].status, 200);
    assert_eq!(seen[1].status, 302);
    assert_eq!(seen[1].url, "/admin");
    assert_eq!(seen[2].status, 403);
    assert_eq!(seen[2].url, "/.env");

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_log_sink_is_ignored() {
    let mut config = config_with_upstream("ok").await;
    config.access_log.endpoint = Some(format!("http://{}/api/log", common::closed_addr().await));
    config.access_log.timeout_ms = 100;
    let server = start(config).await;
    let client = common::client();

    for _ in 0..20 {
        let res = client
            .get(format!("http://{}/", server.addr))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
    }

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_rate_limit_over_http() {
    let mut config = config_with_upstream("ok").await;
    config.rate_limit.max_requests = 3;
    let server = start(config).await;
    let client = common::client();

    let mut statuses = Vec::new();
    for ip in ["192.0.2.1", "192.0.2.1", "192.0.2.1", "192.0.2.1", "192.0.2.2"] {
        let res = client
            .get(format!("http://{}/", server.addr))
            .header("x-forwarded-for", ip)
            .send()
            .await
            .unwrap();
        statuses.push(res.status().as_u16());
    }
    assert_eq!(statuses, vec![200, 200, 200, 429, 200]);

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_down_is_bad_gateway() {
    let mut config = GatekeeperConfig::default();
    config.upstream.url = format!("http://{}", common::closed_addr().await);
    let server = start(config).await;

    let res = common::client()
        .get(format!("http://{}/", server.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 502);

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_rules_reload_without_restart() {
    let config = config_with_upstream("ok").await;
    let server = start(config.clone()).await;
    let client = common::client();
    let url = format!("http://{}/drafts/secret", server.addr);

    assert_eq!(client.get(&url).send().await.unwrap().status(), 200);

    let mut updated = config;
    updated.blocked_paths.substrings.push("/drafts".into());
    server.updates.send(updated).unwrap();

    let mut status = 0;
    for _ in 0..50 {
        status = client.get(&url).send().await.unwrap().status().as_u16();
        if status == 403 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(status, 403);

    server.shutdown.trigger();
}
