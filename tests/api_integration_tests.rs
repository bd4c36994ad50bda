//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Duration;
use distcache::{
    api::create_router, clock::MockClock, AppState, CacheOptions, DistributedCache, InMemoryStore,
};
use serde_json::Value;
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> Router {
    create_test_app_with_clock().0
}

fn create_test_app_with_clock() -> (Router, MockClock) {
    let options = CacheOptions::default();
    let store = Arc::new(InMemoryStore::with_table(options.cache_table_name.clone()));
    let clock = MockClock::new();
    let cache = DistributedCache::with_clock(store, options, Arc::new(clock.clone())).unwrap();
    (create_router(AppState::new(cache)), clock)
}

async fn body_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX).await.unwrap().to_vec()
}

async fn body_to_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).unwrap()
}

fn put(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/octet-stream")
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// == SET Endpoint Tests ==

#[tokio::test]
async fn test_set_endpoint_success() {
    let app = create_test_app();

    let response = app.oneshot(put("/cache/test_key", "test_value")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["key"], "test_key");
    assert!(json["message"].as_str().unwrap().contains("test_key"));
}

#[tokio::test]
async fn test_set_endpoint_with_expirations() {
    let app = create_test_app();

    let response = app
        .oneshot(put(
            "/cache/ttl_key?expires_in_secs=60&sliding_secs=30",
            "ttl_value",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_set_endpoint_past_absolute_expiration() {
    let app = create_test_app();

    let response = app
        .clone()
        .oneshot(put(
            "/cache/throws?absolute_expiration=2000-01-01T00:00:00Z",
            vec![1u8; 8],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("Invalid expiration"));

    // Nothing was written
    let response = app.oneshot(get("/cache/throws")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_set_endpoint_unstorable_expiration() {
    let app = create_test_app();

    // Roughly 9500 years from now
    let response = app
        .clone()
        .oneshot(put("/cache/k?sliding_secs=300000000000", "value"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(put(
            "/cache/k?absolute_expiration=9999-12-31T23:59:59.999999999Z",
            "value",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/cache/k")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response.into_body()).await, b"value");
}

#[tokio::test]
async fn test_set_endpoint_invalid_query() {
    let app = create_test_app();

    let response = app
        .oneshot(put("/cache/k?sliding_secs=soon", "value"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == GET Endpoint Tests ==

#[tokio::test]
async fn test_get_endpoint_returns_exact_bytes() {
    let app = create_test_app();
    let content: Vec<u8> = (0..=255).collect();

    let set_response = app
        .clone()
        .oneshot(put("/cache/binary", content.clone()))
        .await
        .unwrap();
    assert_eq!(set_response.status(), StatusCode::OK);

    let get_response = app.oneshot(get("/cache/binary")).await.unwrap();
    assert_eq!(get_response.status(), StatusCode::OK);
    assert_eq!(
        get_response.headers()["content-type"],
        "application/octet-stream"
    );
    assert_eq!(body_bytes(get_response.into_body()).await, content);
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let app = create_test_app();

    let response = app.oneshot(get("/cache/does_not_exist")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("does_not_exist"));
}

#[tokio::test]
async fn test_key_too_long() {
    let app = create_test_app();
    let uri = format!("/cache/{}", "x".repeat(2049));

    let response = app.oneshot(get(&uri)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == DELETE Endpoint Tests ==

#[tokio::test]
async fn test_delete_endpoint_success() {
    let app = create_test_app();

    app.clone()
        .oneshot(put("/cache/del_key", "del_value"))
        .await
        .unwrap();

    let response = app.clone().oneshot(delete("/cache/del_key")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("deleted"));

    let response = app.oneshot(get("/cache/del_key")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_endpoint_absent_key() {
    let app = create_test_app();

    let response = app.oneshot(delete("/cache/does_not_exist")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// == REFRESH Endpoint Tests ==

#[tokio::test]
async fn test_refresh_keeps_entry_alive() {
    let (app, clock) = create_test_app_with_clock();

    app.clone()
        .oneshot(put("/cache/session?sliding_secs=60", "token"))
        .await
        .unwrap();

    clock.advance(Duration::seconds(50));
    let response = app.clone().oneshot(post("/cache/session/refresh")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    clock.advance(Duration::seconds(50));
    let response = app.clone().oneshot(get("/cache/session")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response.into_body()).await, b"token");

    // No read for a full window
    clock.advance(Duration::seconds(60));
    let response = app.oneshot(get("/cache/session")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_refresh_absent_key() {
    let app = create_test_app();

    let response = app.oneshot(post("/cache/ghost/refresh")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// == Health Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}
