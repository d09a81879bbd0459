//! HTTP API tests.
//!
//! Exercises the router with `tower::ServiceExt::oneshot`, no socket needed.

// Allow unwrap in tests - tests should panic on unexpected errors
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use order_manager::application::services::{Orchestrator, OrchestratorConfig};
use order_manager::infrastructure::exchange::SimulatedExchange;
use order_manager::infrastructure::http::{AppState, create_router};
use order_manager::infrastructure::messaging::InMemoryEventPublisher;
use order_manager::infrastructure::persistence::InMemoryOrderStore;

/// Router over an orchestrator whose workers are not started, so accepted
/// orders stay PENDING.
fn app() -> (Router, Arc<InMemoryOrderStore>) {
    let store = Arc::new(InMemoryOrderStore::new());
    let orchestrator = Orchestrator::new(
        Arc::clone(&store),
        Arc::new(SimulatedExchange::new(Duration::ZERO)),
        Arc::new(InMemoryEventPublisher::new()),
        OrchestratorConfig {
            queue_capacity: 64,
            ..OrchestratorConfig::default()
        },
    )
    .unwrap();
    let router = create_router(AppState {
        orchestrator: Arc::new(orchestrator),
        version: "test".to_string(),
    });
    (router, store)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn post_order(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/orders")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn market(id: &str) -> Value {
    json!({
        "id": id,
        "symbol": "BTCUSDT",
        "side": "BUY",
        "type": "MARKET",
        "quantity": 0.001
    })
}

#[tokio::test]
async fn health_reports_version() {
    let (app, _) = app();

    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], "test");
}

#[tokio::test]
async fn create_order_returns_202_with_pending_order() {
    let (app, store) = app();

    let (status, body) = send(&app, post_order(&market("O1"))).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["id"], "O1");
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["type"], "MARKET");
    assert_eq!(body["quantity"], "0.001");
    assert_eq!(store.order_count(), 1);
}

#[tokio::test]
async fn create_limit_order_accepts_lowercase_enums_and_string_decimals() {
    let (app, _) = app();
    let request = json!({
        "id": "L1",
        "symbol": "ETHUSDT",
        "side": "sell",
        "type": "limit",
        "quantity": "1.5",
        "price": "2500.25"
    });

    let (status, body) = send(&app, post_order(&request)).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["side"], "SELL");
    assert_eq!(body["price"], "2500.25");
}

#[tokio::test]
async fn invalid_orders_return_400_and_write_nothing() {
    let (app, store) = app();
    let bad = [
        json!({ "id": "O1", "symbol": "BTCUSDT", "side": "BUY", "type": "MARKET", "quantity": 0 }),
        json!({ "id": "O2", "symbol": "BTCUSDT", "side": "HOLD", "type": "MARKET", "quantity": 1 }),
        json!({ "id": "O3", "symbol": "BTCUSDT", "side": "BUY", "type": "LIMIT", "quantity": 1 }),
        json!({ "id": "", "symbol": "BTCUSDT", "side": "BUY", "type": "MARKET", "quantity": 1 }),
        json!({ "symbol": "BTCUSDT" }),
    ];

    for body in &bad {
        let (status, response) = send(&app, post_order(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(response["error"], "INVALID_ORDER");
    }
    assert_eq!(store.order_count(), 0);
    assert!(store.outbox_snapshot().is_empty());
}

#[tokio::test]
async fn malformed_json_returns_400() {
    let (app, _) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/orders")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_ORDER");
}

#[tokio::test]
async fn duplicate_order_returns_409() {
    let (app, _) = app();
    send(&app, post_order(&market("O1"))).await;

    let (status, body) = send(&app, post_order(&market("O1"))).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "DUPLICATE_ORDER");
}

#[tokio::test]
async fn store_outage_returns_503() {
    let (app, store) = app();
    store.set_available(false);

    let (status, body) = send(&app, post_order(&market("O1"))).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "STORAGE_UNAVAILABLE");
}

#[tokio::test]
async fn get_order_returns_stored_order_or_404() {
    let (app, _) = app();
    send(&app, post_order(&market("O1"))).await;

    let (found, body) = send(&app, get("/api/v1/orders/O1")).await;
    let (missing, error) = send(&app, get("/api/v1/orders/nope")).await;

    assert_eq!(found, StatusCode::OK);
    assert_eq!(body["id"], "O1");
    assert_eq!(missing, StatusCode::NOT_FOUND);
    assert_eq!(error["error"], "ORDER_NOT_FOUND");
}

#[tokio::test]
async fn list_orders_filters_by_status_and_limits() {
    let (app, _) = app();
    for id in ["A", "B", "C"] {
        send(&app, post_order(&market(id))).await;
    }

    let (status, all) = send(&app, get("/api/v1/orders")).await;
    let (_, limited) = send(&app, get("/api/v1/orders?limit=2")).await;
    let (_, pending) = send(&app, get("/api/v1/orders?status=pending")).await;
    let (_, completed) = send(&app, get("/api/v1/orders?status=COMPLETED")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(all["count"], 3);
    let ids: Vec<&str> = all["orders"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["C", "B", "A"]);
    assert_eq!(limited["count"], 2);
    assert_eq!(pending["count"], 3);
    assert_eq!(completed["count"], 0);
}

#[tokio::test]
async fn list_orders_rejects_unknown_status() {
    let (app, _) = app();

    let (status, body) = send(&app, get("/api/v1/orders?status=CANCELLED")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_QUERY");
}
