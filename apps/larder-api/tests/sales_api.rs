//! HTTP tests driving the router in-process with `oneshot`.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use larder_api::{router, ApiConfig, AppState};
use larder_core::Money;
use larder_db::{Database, DbConfig};

struct TestApp {
    app: Router,
    db: Database,
    burger_id: i64,
    patty_id: i64,
}

async fn spawn_app() -> TestApp {
    spawn_app_with(ApiConfig {
        sales_page_size_limit: 10,
        ..ApiConfig::default()
    })
    .await
}

/// Burger 5.00 = 2 × Bun (200 @ 0.50) + 1 × Patty (50 @ 1.50).
async fn spawn_app_with(config: ApiConfig) -> TestApp {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();

    let bun = db.store_items().insert("Bun", 200, Money::from_cents(50)).await.unwrap();
    let patty = db.store_items().insert("Patty", 50, Money::from_cents(150)).await.unwrap();
    let burger = db.menu().insert("Burger", Money::from_cents(500)).await.unwrap();
    db.menu().add_recipe_entry(burger.id, bun.id, 2).await.unwrap();
    db.menu().add_recipe_entry(burger.id, patty.id, 1).await.unwrap();

    TestApp {
        app: router(AppState::new(db.clone(), config)),
        db,
        burger_id: burger.id,
        patty_id: patty.id,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

async fn post_sale(app: &Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/sales")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

#[tokio::test]
async fn commit_sale_returns_created() {
    let t = spawn_app().await;

    let (status, body) = post_sale(
        &t.app,
        json!({ "lines": [{ "menuItemId": t.burger_id, "quantity": 10 }] }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["totalAmountCents"], 5000);
    assert_eq!(body["lines"][0]["unitPriceCents"], 500);
    assert_eq!(body["lines"][0]["subtotalCents"], 5000);
    assert!(body["saleId"].as_i64().is_some());
    assert!(body["saleDate"].as_str().is_some());
}

#[tokio::test]
async fn sale_detail_includes_cost_of_goods() {
    let t = spawn_app().await;

    let (_, created) = post_sale(
        &t.app,
        json!({ "lines": [{ "menuItemId": t.burger_id, "quantity": 10 }] }),
    )
    .await;
    let sale_id = created["saleId"].as_i64().unwrap();

    let (status, body) = get(&t.app, &format!("/sales/{sale_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["saleId"], sale_id);
    assert_eq!(body["costOfGoodsCents"], 20 * 50 + 10 * 150);
    assert_eq!(body["costLogs"].as_array().unwrap().len(), 2);

    let (status, body) = get(&t.app, "/sales/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn commit_errors_map_to_status_codes() {
    let t = spawn_app().await;

    let (status, body) = post_sale(
        &t.app,
        json!({ "lines": [{ "menuItemId": t.burger_id, "quantity": 0 }] }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["retryable"], false);

    let (status, body) = post_sale(&t.app, json!({ "lines": [] })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = post_sale(
        &t.app,
        json!({ "lines": [{ "menuItemId": 9999, "quantity": 1 }] }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "UNKNOWN_MENU_ITEM");

    let (status, body) = post_sale(
        &t.app,
        json!({ "lines": [{ "menuItemId": t.burger_id, "quantity": 51 }] }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains(&format!("store item {}", t.patty_id)));
}

#[tokio::test]
async fn malformed_json_is_rejected_by_the_extractor() {
    let t = spawn_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/sales")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"lines\": [{\"menuItemId\": \"burger\"}]}"))
        .unwrap();
    let (status, _) = send(&t.app, request).await;

    assert!(status.is_client_error());
    assert_ne!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn list_sales_is_paginated_and_clamped() {
    let t = spawn_app().await;

    for _ in 0..3 {
        let (status, _) = post_sale(
            &t.app,
            json!({ "lines": [{ "menuItemId": t.burger_id, "quantity": 1 }] }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = get(&t.app, "/sales?page=1&perPage=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (_, body) = get(&t.app, "/sales?perPage=1000").await;
    assert_eq!(body["perPage"], 10);
    assert_eq!(body["page"], 1);
}

#[tokio::test]
async fn zero_page_size_limit_still_serves_one_per_page() {
    let t = spawn_app_with(ApiConfig {
        sales_page_size_limit: 0,
        ..ApiConfig::default()
    })
    .await;
    post_sale(
        &t.app,
        json!({ "lines": [{ "menuItemId": t.burger_id, "quantity": 1 }] }),
    )
    .await;

    let (status, body) = get(&t.app, "/sales?perPage=5").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["perPage"], 1);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unrepresentable_cost_of_goods_is_a_server_error() {
    let t = spawn_app().await;

    let (_, created) = post_sale(
        &t.app,
        json!({ "lines": [{ "menuItemId": t.burger_id, "quantity": 1 }] }),
    )
    .await;
    let sale_id = created["saleId"].as_i64().unwrap();
    let detail_id = t.db.sales().details(sale_id).await.unwrap()[0].id;

    sqlx::query(
        "INSERT INTO sale_cost_logs \
         (sale_detail_id, store_item_id, quantity_used, cost_at_time_of_sale_cents) \
         VALUES (?1, ?2, 4000000000, 4000000000)",
    )
    .bind(detail_id)
    .bind(t.patty_id)
    .execute(t.db.pool())
    .await
    .unwrap();

    let (status, body) = get(&t.app, &format!("/sales/{sale_id}")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "DATABASE_ERROR");
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn health_reports_serving() {
    let t = spawn_app().await;

    let (status, body) = get(&t.app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "serving");
    assert_eq!(body["database"], true);
}
