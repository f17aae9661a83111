// HTTP surface: control endpoint status codes and bodies, health, CORS.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use pulse_core::PulseConfig;
use pulse_gateway::{build_router, AppState};
use pulse_relay::{BroadcastMode, Relay};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn test_state() -> Arc<AppState> {
    let mut config = PulseConfig::default();
    config.relay.buffer_capacity = 3;
    let relay = Arc::new(Relay::new(&config.relay).unwrap());
    Arc::new(AppState::new(config, relay))
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_interval(router: &Router, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/broadcast_interval")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}

#[tokio::test]
async fn interval_is_accepted_and_echoed() {
    let state = test_state();
    let router = build_router(Arc::clone(&state));

    let (status, body) = post_interval(&router, r#"{"interval": 500}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"message": "Parameter received", "interval": {"interval": 500}})
    );
    assert_eq!(state.relay.mode(), BroadcastMode::Timed { interval_ms: 500 });
    assert!(state.relay.timer_active().await);

    let (status, _) = post_interval(&router, r#"{"interval": 0}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.relay.mode(), BroadcastMode::Immediate);
    assert!(!state.relay.timer_active().await);
}

#[tokio::test]
async fn missing_interval_leaves_mode_unchanged() {
    let state = test_state();
    let router = build_router(Arc::clone(&state));
    post_interval(&router, r#"{"interval": 250}"#).await;

    let (status, body) = post_interval(&router, "{}").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Missing 'interval' parameter"}));
    assert_eq!(state.relay.mode(), BroadcastMode::Timed { interval_ms: 250 });

    state.shutdown().await;
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let state = test_state();
    let router = build_router(Arc::clone(&state));

    let (status, body) = post_interval(&router, "interval=500").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid JSON"}));
    assert_eq!(state.relay.mode(), BroadcastMode::Immediate);
}

#[tokio::test]
async fn negative_non_integer_or_huge_interval_is_rejected() {
    let state = test_state();
    let router = build_router(Arc::clone(&state));

    for bad in [
        r#"{"interval": -1}"#,
        r#"{"interval": "fast"}"#,
        r#"{"interval": 0.5}"#,
        r#"{"interval": 18446744073709551615}"#,
    ] {
        let (status, body) = post_interval(&router, bad).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {bad}");
        assert_eq!(body, json!({"error": "Invalid 'interval' parameter"}));
    }
    assert_eq!(state.relay.mode(), BroadcastMode::Immediate);
    assert!(!state.relay.timer_active().await);
}

#[tokio::test]
async fn health_reports_relay_state() {
    let state = test_state();
    for v in 1..=4i64 {
        state.relay.ingest(vec![v].into());
    }
    let router = build_router(Arc::clone(&state));

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["mode"], json!({"kind": "immediate"}));
    assert_eq!(body["buffered"], 3);
    assert_eq!(body["capacity"], 3);
    assert_eq!(body["subscribers"], 0);
    assert_eq!(body["ingest_running"], false);
}

#[tokio::test]
async fn cors_mirrors_origin_by_default() {
    let router = build_router(test_state());
    let request = Request::builder()
        .uri("/health")
        .header("origin", "http://localhost:5173")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let headers = response.headers();
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "http://localhost:5173"
    );
    assert_eq!(headers.get("access-control-allow-credentials").unwrap(), "true");
}

#[tokio::test]
async fn cors_preflight_for_control_endpoint() {
    let router = build_router(test_state());
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/broadcast_interval")
        .header("origin", "http://localhost:5173")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert!(response.status().is_success());
    let headers = response.headers();
    assert_eq!(headers.get("access-control-allow-methods").unwrap(), "POST");
    assert_eq!(
        headers.get("access-control-allow-headers").unwrap(),
        "content-type"
    );
}

#[tokio::test]
async fn cors_origin_list_is_enforced() {
    let mut config = PulseConfig::default();
    config.cors.allowed_origins = vec!["http://dashboard.local".to_string()];
    let relay = Arc::new(Relay::new(&config.relay).unwrap());
    let router = build_router(Arc::new(AppState::new(config, relay)));

    let allowed = Request::builder()
        .uri("/health")
        .header("origin", "http://dashboard.local")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(allowed).await.unwrap();
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "http://dashboard.local"
    );

    let denied = Request::builder()
        .uri("/health")
        .header("origin", "http://elsewhere.local")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(denied).await.unwrap();
    assert!(response.headers().get("access-control-allow-origin").is_none());
}
