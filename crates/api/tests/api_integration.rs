//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::{InMemoryStore, StoreOp};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> (axum::Router, InMemoryStore) {
    let store = InMemoryStore::new();
    let state = api::create_state(store.clone());
    (api::create_app(state, get_metrics_handle()), store)
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn seed_product(app: &axum::Router, sku: &str, price: &str, stock: u32) -> i64 {
    let (status, json) = send(
        app,
        "POST",
        "/products",
        Some(json!({
            "name": format!("Product {sku}"),
            "sku": sku,
            "price": price,
            "stock": stock,
            "category": "tools"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_i64().unwrap()
}

async fn seed_customer(app: &axum::Router, email: &str) -> i64 {
    let (status, json) = send(
        app,
        "POST",
        "/customers",
        Some(json!({
            "name": "Alice",
            "email": email,
            "phone": "555-0100",
            "city": "Lisbon"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_i64().unwrap()
}

async fn place_order(
    app: &axum::Router,
    customer_id: i64,
    product_id: i64,
    quantity: u32,
) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/orders",
        Some(json!({
            "customer_id": customer_id,
            "lines": [{ "product_id": product_id, "quantity": quantity }]
        })),
    )
    .await
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();

    let (status, json) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_order_lifecycle() {
    let (app, _) = setup();
    let customer = seed_customer(&app, "alice@example.com").await;
    let product = seed_product(&app, "P1", "5.00", 10).await;

    let (status, order) = place_order(&app, customer, product, 3).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["order"]["total_amount"], 1500);
    assert_eq!(order["order"]["status"], "PLACED");
    assert_eq!(order["customer"]["email"], "alice@example.com");
    assert_eq!(order["lines"][0]["quantity"], 3);
    let order_id = order["order"]["id"].as_i64().unwrap();

    let (_, product_json) = send(&app, "GET", &format!("/products/{product}"), None).await;
    assert_eq!(product_json["stock"], 7);

    let (status, payment) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/payment"),
        Some(json!({ "method": "Card" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payment["status"], "PAID");
    assert_eq!(payment["method"], "Card");

    let (_, details) = send(&app, "GET", &format!("/orders/{order_id}"), None).await;
    assert_eq!(details["order"]["status"], "COMPLETED");

    let (status, json) = send(&app, "POST", &format!("/orders/{order_id}/cancel"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("COMPLETED"));

    let (status, _) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/payment"),
        Some(json!({ "method": "Cash" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cancel_restores_stock() {
    let (app, _) = setup();
    let customer = seed_customer(&app, "alice@example.com").await;
    let product = seed_product(&app, "P1", "5.00", 10).await;

    let (_, order) = place_order(&app, customer, product, 4).await;
    let order_id = order["order"]["id"].as_i64().unwrap();

    let (status, cancelled) =
        send(&app, "POST", &format!("/orders/{order_id}/cancel"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "CANCELLED");

    let (_, product_json) = send(&app, "GET", &format!("/products/{product}"), None).await;
    assert_eq!(product_json["stock"], 10);
}

#[tokio::test]
async fn test_insufficient_stock_is_unprocessable() {
    let (app, store) = setup();
    let customer = seed_customer(&app, "alice@example.com").await;
    let product = seed_product(&app, "P1", "5.00", 10).await;

    let (status, json) = place_order(&app, customer, product, 20).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("Requested: 20"));
    assert!(message.contains("Available: 10"));
    assert_eq!(store.order_count().await, 0);
}

#[tokio::test]
async fn test_not_found_and_bad_ids() {
    let (app, _) = setup();

    let (status, json) = send(&app, "GET", "/orders/9999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Order 9999 not found");

    let (status, _) = send(&app, "GET", "/products/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = place_order(&app, 42, 1, 1).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_product_administration() {
    let (app, _) = setup();
    let product = seed_product(&app, "P1", "5.00", 3).await;
    seed_product(&app, "P2", "5.00", 30).await;

    let (status, json) = send(
        &app,
        "POST",
        "/products",
        Some(json!({ "name": "Dup", "sku": "P1", "price": 100 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("P1"));

    let (status, _) = send(
        &app,
        "POST",
        "/products",
        Some(json!({ "name": "Free", "sku": "P3", "price": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(
        &app,
        "POST",
        "/products",
        Some(json!({ "name": "Half", "sku": "P4", "price": 12.5, "stock": 40 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["price"], 1250);

    let (status, _) = send(
        &app,
        "POST",
        "/products",
        Some(json!({ "name": "Odd", "sku": "P5", "price": "1.234", "stock": 40 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, low) = send(&app, "GET", "/products/low-stock", None).await;
    assert_eq!(low.as_array().unwrap().len(), 1);
    assert_eq!(low[0]["sku"], "P1");

    let (status, restocked) = send(
        &app,
        "POST",
        &format!("/products/{product}/restock"),
        Some(json!({ "quantity": 7 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(restocked["stock"], 10);

    let (_, listed) = send(&app, "GET", "/products?category=tools&limit=1", None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_customer_administration() {
    let (app, _) = setup();
    let customer = seed_customer(&app, "alice@example.com").await;
    let product = seed_product(&app, "P1", "5.00", 10).await;

    let (status, _) = send(&app, "GET", "/customers/search", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, found) = send(&app, "GET", "/customers/search?city=Lisbon", None).await;
    assert_eq!(found.as_array().unwrap().len(), 1);

    let (status, updated) = send(
        &app,
        "PATCH",
        &format!("/customers/{customer}"),
        Some(json!({ "city": "Porto" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["city"], "Porto");

    place_order(&app, customer, product, 1).await;
    let (_, orders) = send(&app, "GET", &format!("/customers/{customer}/orders"), None).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);

    let (status, json) = send(&app, "DELETE", &format!("/customers/{customer}"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("1 existing order"));

    let other = seed_customer(&app, "bob@example.com").await;
    let (status, _) = send(&app, "DELETE", &format!("/customers/{other}"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_sales_report() {
    let (app, _) = setup();
    let customer = seed_customer(&app, "alice@example.com").await;
    let product = seed_product(&app, "P1", "5.00", 10).await;

    let (_, order) = place_order(&app, customer, product, 2).await;
    let order_id = order["order"]["id"].as_i64().unwrap();
    place_order(&app, customer, product, 1).await;
    send(
        &app,
        "POST",
        &format!("/orders/{order_id}/payment"),
        Some(json!({ "method": "Card" })),
    )
    .await;

    let today = chrono::Utc::now().date_naive();
    let (status, report) = send(
        &app,
        "GET",
        &format!("/reports/sales?start_date={today}&end_date={today}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total_orders"], 1);
    assert_eq!(report["total_revenue"], 1000);

    let (status, _) = send(
        &app,
        "GET",
        "/reports/sales?start_date=2024-02-01&end_date=2024-01-01",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_open_workflows_lists_flagged_runs() {
    let (app, store) = setup();
    let customer = seed_customer(&app, "alice@example.com").await;
    let product = seed_product(&app, "P1", "5.00", 10).await;

    let (_, open) = send(&app, "GET", "/workflows/open", None).await;
    assert!(open.as_array().unwrap().is_empty());

    store.fail_on(StoreOp::UpdateProduct, 0).await;
    let (status, _) = place_order(&app, customer, product, 2).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    store.clear_faults().await;

    let (status, open) = send(&app, "GET", "/workflows/open", None).await;
    assert_eq!(status, StatusCode::OK);
    let runs = open.as_array().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["kind"], "place_order");
    assert_eq!(runs[0]["state"], "NeedsReconciliation");
    assert_eq!(runs[0]["failed_step"], "debit_stock");
    assert_eq!(runs[0]["completed_steps"].as_array().unwrap().len(), 3);
}
