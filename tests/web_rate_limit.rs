use axum::{body::{Body, to_bytes}, http::{Request, StatusCode}};
use serde_json::json;
use std::sync::Arc;
use tokengate::config::Config;
use tokengate::shared::ConcurrentStore;
use tokengate::web::{AppStateInner, create_router};
use tower::ServiceExt; // for .oneshot()

fn app(max_requests: u32, window_secs: u64) -> axum::Router {
    let mut config = Config::default();
    config.rate_limit.max_requests = max_requests;
    config.rate_limit.window_secs = window_secs;
    config.protected.delay_ms = 0;
    let state = AppStateInner::from_config(
        &config,
        Arc::new(ConcurrentStore::new()),
        Arc::new(ConcurrentStore::new()),
    );
    create_router(Arc::new(state))
}

fn login_request(client_ip: &str) -> Request<Body> {
    let login_body = json!({"username": "admin", "password": "wrong"});
    Request::builder()
        .method("POST")
        .uri("/api/v1/generatetoken")
        .header("content-type", "application/json")
        .header("x-forwarded-for", client_ip)
        .body(Body::from(login_body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_rate_limit() {
    let app = app(5, 60);
    // 5 allowed attempts
    for _ in 0..5 {
        let response = app.clone().oneshot(login_request("127.0.0.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    // 6th attempt should be rate limited
    let response = app.clone().oneshot(login_request("127.0.0.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["message"], "Too many requests");

    // Another client is unaffected
    let response = app.oneshot(login_request("10.1.2.3")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rate_limit_applies_to_every_route() {
    let app = app(2, 60);
    let create = || {
        Request::builder()
            .method("POST")
            .uri("/api/v1/createuser")
            .header("content-type", "application/json")
            .header("x-forwarded-for", "127.0.0.9")
            .body(Body::from(json!({"username": "u", "password": "p"}).to_string()))
            .unwrap()
    };
    assert_eq!(app.clone().oneshot(create()).await.unwrap().status(), StatusCode::OK);
    assert_eq!(app.clone().oneshot(create()).await.unwrap().status(), StatusCode::FORBIDDEN);
    assert_eq!(
        app.oneshot(login_request("127.0.0.9")).await.unwrap().status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn test_rate_limit_reset() {
    let app = app(5, 1);
    for _ in 0..5 {
        let response = app.clone().oneshot(login_request("127.0.0.2")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    let response = app.clone().oneshot(login_request("127.0.0.2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    // Wait for window to expire
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    // Still unauthorized, but not rate limited
    let response = app.oneshot(login_request("127.0.0.2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
