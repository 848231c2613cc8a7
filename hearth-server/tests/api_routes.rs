//! Router tests for requests answered before any query runs.
//!
//! The pool connects lazily to an address nothing listens on, so a handler
//! that reached the database would fail with 500 instead of the expected
//! status.

use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use hearth_core::HearthConfig;
use hearth_server::{build_router, AppState};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

fn app() -> Router {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(200))
        .connect_lazy("postgres://hearth@127.0.0.1:1/hearth_unreachable")
        .expect("lazy pool");

    let mut config = HearthConfig::default();
    config.bulk_upload.max_records = 2;

    build_router(AppState::new(pool, config))
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

const ORG: &str = "67e55044-10b1-426f-9247-bb680e5fe0c8";

#[tokio::test]
async fn health_is_ok() {
    let (status, body) = send(get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn blank_organization_name_is_400() {
    let (status, body) = send(post_json(
        "/api/core/organizations",
        json!({ "organization_name": "   " }),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn malformed_json_gets_json_error() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/core/organizations")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn invalid_uuid_in_path_is_400() {
    let (status, body) = send(get("/api/organizations/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "id: invalid UUID format");

    let (status, _) = send(get(&format!("/api/organizations/{ORG}/entities/nope"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_entity_type_filter_is_400() {
    let (status, body) = send(get(&format!(
        "/api/organizations/{ORG}/entities?entity_type=Menu-Item"
    )))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn creating_user_through_entities_is_400() {
    let (status, _) = send(post_json(
        &format!("/api/organizations/{ORG}/entities"),
        json!({ "entity_type": "user", "entity_name": "Mallory" }),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn nul_characters_are_400_not_500() {
    let (status, body) = send(post_json(
        &format!("/api/organizations/{ORG}/entities"),
        json!({ "entity_type": "supplier", "entity_name": "Bad\u{0}Name" }),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = send(post_json(
        &format!("/api/organizations/{ORG}/entities"),
        json!({
            "entity_type": "supplier",
            "entity_name": "Acme",
            "fields": { "notes": "a\u{0}b" }
        }),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = send(post_json(
        "/api/core/organizations",
        json!({ "organization_name": "Nul Bistro", "settings": { "motto": "\u{0}" } }),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = send(get(&format!(
        "/api/organizations/{ORG}/entities?search=%00"
    )))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn user_with_bad_email_is_400() {
    let (status, body) = send(post_json(
        &format!("/api/organizations/{ORG}/users"),
        json!({ "name": "Ana", "email": "ana-at-example", "role": "manager" }),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().starts_with("email"));
}

#[tokio::test]
async fn self_relationship_is_400() {
    let entity = "0b2c0f3e-8a43-4c55-9d0e-2f6b1d2f9a11";
    let (status, _) = send(post_json(
        &format!("/api/organizations/{ORG}/relationships"),
        json!({
            "source_entity_id": entity,
            "target_entity_id": entity,
            "relationship_type": "pairs_with"
        }),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn purchase_order_without_lines_is_400() {
    let (status, body) = send(post_json(
        "/api/purchasing/purchase-orders",
        json!({ "organization_id": ORG, "lines": [] }),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "lines cannot be empty");
}

#[tokio::test]
async fn purchase_order_with_negative_quantity_is_400() {
    let (status, _) = send(post_json(
        "/api/purchasing/purchase-orders",
        json!({
            "organization_id": ORG,
            "lines": [{ "description": "Milk", "quantity": -1.0, "unit_price_cents": 100 }]
        }),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_status_filter_is_400() {
    let (status, _) = send(get(&format!(
        "/api/purchasing/purchase-orders?organization_id={ORG}&status=shipped"
    )))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn purchase_order_reads_need_organization() {
    let order = "0b2c0f3e-8a43-4c55-9d0e-2f6b1d2f9a11";
    let (status, _) = send(get(&format!("/api/purchasing/purchase-orders/{order}"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(post_json(
        "/api/purchasing/purchase-orders/approve",
        json!({ "purchase_order_id": order, "approver_id": order }),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bulk_upload_unknown_kind_is_400() {
    let (status, body) = send(post_json(
        "/api/bulk-upload/invoices",
        json!({ "organization_id": ORG, "records": [{}] }),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("invoices"));
}

#[tokio::test]
async fn bulk_upload_over_limit_is_413() {
    let (status, body) = send(post_json(
        "/api/bulk-upload/entities",
        json!({ "organization_id": ORG, "records": [{}, {}, {}] }),
    ))
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "payload_too_large");
}

#[tokio::test]
async fn bulk_upload_empty_batch_is_400() {
    let (status, _) = send(post_json(
        "/api/bulk-upload/users",
        json!({ "organization_id": ORG, "records": [] }),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn templates_are_listed() {
    let (status, body) = send(get("/api/templates")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["key"], "restaurant");
}

#[tokio::test]
async fn unknown_template_is_404() {
    let (status, body) = send(post_json(
        "/api/templates/food_truck/deploy",
        json!({ "organization_name": "Rolling Tacos" }),
    ))
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "template 'food_truck' not found");
}

#[tokio::test]
async fn unreachable_database_is_generic_500() {
    let (status, body) = send(get(&format!("/api/organizations/{ORG}"))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "an internal error occurred");
}
