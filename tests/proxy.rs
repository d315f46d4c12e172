//! End-to-end proxying through the full server stack.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use upstream_lb::config::LbMethod;

mod common;

async fn named_backend(name: &'static str) -> std::net::SocketAddr {
    common::start_programmable_backend(move |path| async move {
        if path == "/health" {
            (200, "OK".into())
        } else {
            (200, name.to_string())
        }
    })
    .await
}

#[tokio::test]
async fn test_round_robin_end_to_end() {
    let a = named_backend("a").await;
    let b = named_backend("b").await;
    let lb = common::start_balancer(common::config_for(&[a, b])).await;
    let client = common::client();

    let mut bodies = Vec::new();
    for _ in 0..4 {
        let res = client.get(format!("http://{}/", lb.addr)).send().await.unwrap();
        assert_eq!(res.status(), 200);
        assert!(res.headers().contains_key("x-request-id"));
        bodies.push(res.text().await.unwrap());
    }

    assert_eq!(bodies, vec!["a", "b", "a", "b"]);
    assert_eq!(lb.engine.total_served(), 4);
    lb.shutdown.trigger();
}

#[tokio::test]
async fn test_path_and_query_forwarded() {
    let echo = common::start_programmable_backend(|path| async move { (200, path) }).await;
    let lb = common::start_balancer(common::config_for(&[echo])).await;

    let res = common::client()
        .get(format!("http://{}/search/items?q=rust&page=2", lb.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "/search/items?q=rust&page=2");
    lb.shutdown.trigger();
}

#[tokio::test]
async fn test_failover_across_failing_backend() {
    // Passes health checks but fails every proxied request.
    let hits = Arc::new(AtomicU32::new(0));
    let counter = hits.clone();
    let flaky = common::start_programmable_backend(move |path| {
        let counter = counter.clone();
        async move {
            if path == "/health" {
                (200, "OK".into())
            } else {
                counter.fetch_add(1, Ordering::SeqCst);
                (503, "Service Unavailable".into())
            }
        }
    })
    .await;
    let good = named_backend("good").await;

    let lb = common::start_balancer(common::config_for(&[flaky, good])).await;
    let client = common::client();

    for _ in 0..4 {
        let res = client.get(format!("http://{}/", lb.addr)).send().await.unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.text().await.unwrap(), "good");
    }
    assert!(hits.load(Ordering::SeqCst) >= 1);
    lb.shutdown.trigger();
}

#[tokio::test]
async fn test_ip_hash_failover_keeps_method() {
    let flaky = common::start_programmable_backend(|path| async move {
        if path == "/health" {
            (200, "OK".into())
        } else {
            (502, "Bad Gateway".into())
        }
    })
    .await;
    let good = named_backend("good").await;

    let mut config = common::config_for(&[flaky, good]);
    config.lb_method = LbMethod::IpHash;
    // One retry: if the sticky target is the failing backend, the only
    // retry must go to the other one.
    config.retries.max_retries = 1;
    let lb = common::start_balancer(config).await;
    let client = common::client();

    for _ in 0..3 {
        let res = client.get(format!("http://{}/", lb.addr)).send().await.unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.text().await.unwrap(), "good");
    }
    assert_eq!(lb.engine.selector().method(), LbMethod::IpHash);
    lb.shutdown.trigger();
}

#[tokio::test]
async fn test_exhausted_retries_return_500() {
    let broken = common::start_programmable_backend(|path| async move {
        if path == "/health" {
            (200, "OK".into())
        } else {
            (500, "boom".into())
        }
    })
    .await;

    let mut config = common::config_for(&[broken]);
    config.retries.max_retries = 2;
    let lb = common::start_balancer(config).await;

    let res = common::client().get(format!("http://{}/", lb.addr)).send().await.unwrap();
    assert_eq!(res.status(), 500);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["detail"], "All retries failed on all servers.");
    lb.shutdown.trigger();
}

#[tokio::test]
async fn test_client_error_passes_through() {
    let backend = common::start_programmable_backend(|path| async move {
        if path == "/health" {
            (200, "OK".into())
        } else {
            (404, "no such item".into())
        }
    })
    .await;
    let lb = common::start_balancer(common::config_for(&[backend])).await;

    let res = common::client().get(format!("http://{}/items/9", lb.addr)).send().await.unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(res.text().await.unwrap(), "no such item");
    assert_eq!(lb.engine.total_served(), 0);
    lb.shutdown.trigger();
}

#[tokio::test]
async fn test_no_healthy_backends_returns_503() {
    let dead = common::dead_address().await;
    let lb = common::start_balancer(common::config_for(&[dead])).await;

    let res = common::client().get(format!("http://{}/", lb.addr)).send().await.unwrap();
    assert_eq!(res.status(), 503);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["detail"], "No healthy servers available.");
    lb.shutdown.trigger();
}
