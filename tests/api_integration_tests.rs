//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use stash_drivers::api::create_router;
use stash_drivers::driver::{ManualClock, MemoryDriver};
use stash_drivers::{AppState, DriverOptions};
use tower::ServiceExt;

const START: i64 = 1_700_000_000;

// == Helper Functions ==

fn create_test_app() -> (Router, ManualClock) {
    let clock = ManualClock::new(START);
    let options = DriverOptions::default().with_namespace("api").with_ttl(50);
    let driver = MemoryDriver::new(&options, Arc::new(clock.clone())).unwrap();
    let state = AppState::new(Arc::new(driver), Arc::new(clock.clone()), options.ttl);
    (create_router(state), clock)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn store(body: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri("/items")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// == Store Endpoint Tests ==

#[tokio::test]
async fn test_store_endpoint_success() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(store(r#"{"path":["users","42"],"value":{"name":"alice"}}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["path"].as_str().unwrap(), "/users/42");
    assert_eq!(json["expiration"].as_i64().unwrap(), START + 50);
}

#[tokio::test]
async fn test_store_endpoint_rejects_empty_path() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(store(r#"{"path":[],"value":1}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

// == Get Endpoint Tests ==

#[tokio::test]
async fn test_get_endpoint_success() {
    let (app, _) = create_test_app();

    let set_response = app
        .clone()
        .oneshot(store(r#"{"path":["get","key"],"value":"get_value","ttl":20}"#))
        .await
        .unwrap();
    assert_eq!(set_response.status(), StatusCode::OK);

    let get_response = app.oneshot(request("GET", "/items/get/key")).await.unwrap();

    assert_eq!(get_response.status(), StatusCode::OK);
    let json = body_to_json(get_response.into_body()).await;
    assert_eq!(json["path"].as_str().unwrap(), "/get/key");
    assert_eq!(json["value"].as_str().unwrap(), "get_value");
    assert_eq!(json["remaining"].as_u64().unwrap(), 20);
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(request("GET", "/items/nonexistent_key"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_after_ttl_ceiling() {
    let (app, clock) = create_test_app();

    app.clone()
        .oneshot(store(&format!(
            r#"{{"path":["x"],"value":"v1","expiration":{}}}"#,
            START + 1_000
        )))
        .await
        .unwrap();

    let before = app.clone().oneshot(request("GET", "/items/x")).await.unwrap();
    assert_eq!(before.status(), StatusCode::OK);

    clock.advance(60);
    let after = app.oneshot(request("GET", "/items/x")).await.unwrap();
    assert_eq!(after.status(), StatusCode::NOT_FOUND);
}

// == Clear Endpoint Tests ==

#[tokio::test]
async fn test_clear_subtree_endpoint() {
    let (app, _) = create_test_app();

    for body in [
        r#"{"path":["a","b"],"value":1}"#,
        r#"{"path":["a","c"],"value":2}"#,
        r#"{"path":["z"],"value":3}"#,
    ] {
        app.clone().oneshot(store(body)).await.unwrap();
    }

    let response = app.clone().oneshot(request("DELETE", "/items/a")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["path"].as_str().unwrap(), "/a");

    for (uri, status) in [
        ("/items/a/b", StatusCode::NOT_FOUND),
        ("/items/a/c", StatusCode::NOT_FOUND),
        ("/items/z", StatusCode::OK),
    ] {
        let response = app.clone().oneshot(request("GET", uri)).await.unwrap();
        assert_eq!(response.status(), status, "{}", uri);
    }
}

#[tokio::test]
async fn test_clear_all_endpoint() {
    let (app, _) = create_test_app();

    app.clone()
        .oneshot(store(r#"{"path":["k"],"value":1}"#))
        .await
        .unwrap();

    let response = app.clone().oneshot(request("DELETE", "/items")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(request("GET", "/items/k")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == Purge Endpoint Tests ==

#[tokio::test]
async fn test_purge_endpoint() {
    let (app, clock) = create_test_app();

    app.clone()
        .oneshot(store(r#"{"path":["short"],"value":1,"ttl":5}"#))
        .await
        .unwrap();
    app.clone()
        .oneshot(store(r#"{"path":["long"],"value":2,"ttl":40}"#))
        .await
        .unwrap();
    clock.advance(10);

    let response = app.clone().oneshot(request("POST", "/purge")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["driver"].as_str().unwrap(), "memory");

    let response = app.oneshot(request("GET", "/items/long")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// == Stats, Health and Drivers Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint() {
    let (app, _) = create_test_app();

    app.clone()
        .oneshot(store(r#"{"path":["stats_key"],"value":"v"}"#))
        .await
        .unwrap();
    app.clone()
        .oneshot(request("GET", "/items/stats_key"))
        .await
        .unwrap();
    app.clone()
        .oneshot(request("GET", "/items/missing"))
        .await
        .unwrap();

    let response = app.oneshot(request("GET", "/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["hits"].as_u64().unwrap(), 1);
    assert_eq!(json["misses"].as_u64().unwrap(), 1);
    assert_eq!(json["stores"].as_u64().unwrap(), 1);
    assert!((json["hit_rate"].as_f64().unwrap() - 0.5).abs() < 0.001);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = create_test_app();

    let response = app.oneshot(request("GET", "/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"].as_str().unwrap(), "healthy");
    assert_eq!(json["driver"].as_str().unwrap(), "memory");
}

#[tokio::test]
async fn test_drivers_endpoint_lists_every_kind() {
    let (app, _) = create_test_app();

    let response = app.oneshot(request("GET", "/drivers")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    let kinds: Vec<&str> = json["drivers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["memory", "shared", "file", "composite"]);
}
