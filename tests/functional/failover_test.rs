//! Functional tests for credential failover across requests

use img_relay_gateway::config::Settings;
use img_relay_gateway::error::DispatchError;
use img_relay_gateway::gateway::GenerateParams;
use img_relay_gateway::AppState;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{bearer_token, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(base_url: &str, keys: &[&str], min_interval_ms: u64) -> Settings {
    let mut settings = Settings::default();
    settings.upstream.base_url = base_url.to_string();
    settings.upstream.timeout_ms = 2_000;
    settings.credentials.api_keys = keys.iter().map(|k| k.to_string()).collect();
    settings.rate_gate.min_interval_ms = min_interval_ms;
    settings.static_files.enabled = false;
    settings
}

async fn mount(server: &MockServer, token: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .and(bearer_token(token))
        .respond_with(response)
        .mount(server)
        .await;
}

fn ok(url: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"data": [{"url": url}]}))
}

async fn hits_for(server: &MockServer, token: &str) -> usize {
    let expected = format!("Bearer {}", token);
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| {
            r.headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                == Some(expected.as_str())
        })
        .count()
}

#[tokio::test]
async fn test_rotation_persists_across_requests() {
    let server = MockServer::start().await;
    mount(&server, "k1", ResponseTemplate::new(429)).await;
    mount(&server, "k2", ok("https://cdn/k2.png")).await;
    mount(&server, "k3", ok("https://cdn/k3.png")).await;

    let state = AppState::from_settings(settings(&server.uri(), &["k1", "k2", "k3"], 0)).unwrap();

    for _ in 0..5 {
        let images = state
            .dispatcher
            .generate(GenerateParams::prompt("a tidal pool"))
            .await
            .unwrap();
        assert_eq!(images, vec!["https://cdn/k2.png"]);
    }

    // only the first request paid for discovering that k1 was throttled
    assert_eq!(hits_for(&server, "k1").await, 1);
    assert_eq!(hits_for(&server, "k2").await, 5);
    assert_eq!(hits_for(&server, "k3").await, 0);
}

#[tokio::test]
async fn test_failover_wraps_around_pool() {
    let server = MockServer::start().await;
    mount(&server, "k1", ok("https://cdn/k1.png")).await;
    mount(&server, "k2", ResponseTemplate::new(429)).await;
    mount(&server, "k3", ResponseTemplate::new(429)).await;

    let state = AppState::from_settings(settings(&server.uri(), &["k1", "k2", "k3"], 0)).unwrap();
    state.dispatcher.pool().rotate();

    let images = state
        .dispatcher
        .generate(GenerateParams::prompt("wrap"))
        .await
        .unwrap();

    assert_eq!(images, vec!["https://cdn/k1.png"]);
    assert_eq!(state.dispatcher.pool().cursor(), 0);
}

#[tokio::test]
async fn test_exhaustion_never_exceeds_pool_size() {
    let server = MockServer::start().await;
    for key in ["k1", "k2", "k3"] {
        mount(&server, key, ResponseTemplate::new(429)).await;
    }

    let state = AppState::from_settings(settings(&server.uri(), &["k1", "k2", "k3"], 0)).unwrap();

    for round in 1..=2 {
        let err = state
            .dispatcher
            .generate(GenerateParams::prompt("busy"))
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::CredentialsExhausted { attempts: 3 });
        assert_eq!(server.received_requests().await.unwrap().len(), 3 * round);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_gate_token() {
    let server = MockServer::start().await;
    mount(&server, "k1", ok("https://cdn/1.png")).await;

    let state = Arc::new(
        AppState::from_settings(settings(&server.uri(), &["k1"], 60_000)).unwrap(),
    );

    let tasks = (0..8).map(|i| {
        let state = state.clone();
        tokio::spawn(async move {
            state
                .dispatcher
                .generate(GenerateParams::prompt(format!("request {}", i)))
                .await
        })
    });

    let results: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let admitted = results.iter().filter(|r| r.is_ok()).count();
    let gated = results
        .iter()
        .filter(|r| matches!(r, Err(DispatchError::RateLimited { .. })))
        .count();

    assert_eq!(admitted, 1);
    assert_eq!(gated, 7);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_exhaustion_terminates() {
    let server = MockServer::start().await;
    for key in ["k1", "k2"] {
        mount(&server, key, ResponseTemplate::new(429)).await;
    }

    let state = Arc::new(AppState::from_settings(settings(&server.uri(), &["k1", "k2"], 0)).unwrap());

    let tasks = (0..6).map(|_| {
        let state = state.clone();
        tokio::spawn(async move {
            state
                .dispatcher
                .generate(GenerateParams::prompt("crowded"))
                .await
        })
    });

    for result in futures::future::join_all(tasks).await {
        assert_eq!(
            result.unwrap().unwrap_err(),
            DispatchError::CredentialsExhausted { attempts: 2 }
        );
    }

    // each request makes exactly pool-size attempts
    assert_eq!(server.received_requests().await.unwrap().len(), 12);
    assert!(state.dispatcher.pool().cursor() < 2);
}
