//! Approve and reject through the router against a real database
//!
//! Run with: DATABASE_URL=postgres://... cargo test -p hearth-server -- --ignored

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use hearth_core::{HearthConfig, UserRecord};
use hearth_server::db::{
    self, EntityRepo, NewEntity, NewPurchaseOrder, OrganizationRepo, TransactionRepo,
};
use hearth_server::models::{
    EntityName, EntityType, OrderLineInput, OrderLines, OrganizationName, USER_ENTITY_TYPE,
};
use hearth_server::services::inputs::user_from_record;
use hearth_server::{build_router, AppState};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

/// Manager approval limit used by every test here
const THRESHOLD_CENTS: i64 = 100_00;

struct Fixture {
    pool: PgPool,
    org: Uuid,
}

impl Fixture {
    async fn new(name: &str) -> Self {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = db::create_pool(&url).await.unwrap();
        db::migrations::run(&pool).await.unwrap();
        let org = organization(&pool, name).await;
        Self { pool, org }
    }

    fn app(&self) -> Router {
        let mut config = HearthConfig::default();
        config.purchasing.approval_threshold_cents = THRESHOLD_CENTS;
        build_router(AppState::new(self.pool.clone(), config))
    }

    async fn user(&self, org: Uuid, name: &str, role: &str) -> Uuid {
        let record = UserRecord {
            name: name.into(),
            email: format!("{}@example.com", name.to_ascii_lowercase()),
            role: role.into(),
        };
        EntityRepo::new(&self.pool)
            .create(org, &user_from_record(&record).unwrap())
            .await
            .unwrap()
            .entity
            .id
    }

    /// A user entity written without the `role` field
    async fn user_without_role(&self, name: &str) -> Uuid {
        let new = NewEntity {
            entity_type: EntityType::new(USER_ENTITY_TYPE).unwrap(),
            name: EntityName::new(name).unwrap(),
            code: None,
            status: None,
            fields: vec![],
        };
        EntityRepo::new(&self.pool)
            .create(self.org, &new)
            .await
            .unwrap()
            .entity
            .id
    }

    async fn order(&self, unit_price_cents: i64) -> Uuid {
        let lines = OrderLines::new(vec![OrderLineInput {
            entity_id: None,
            description: "Parmigiano wheel".into(),
            quantity: 1.0,
            unit_price_cents,
        }])
        .unwrap();

        TransactionRepo::new(&self.pool)
            .create_purchase_order(
                &NewPurchaseOrder {
                    organization_id: self.org,
                    supplier_id: None,
                    notes: None,
                    lines,
                },
                "PO",
            )
            .await
            .unwrap()
            .transaction
            .id
    }

    async fn approve(&self, order: Uuid, approver: Uuid) -> (StatusCode, Value) {
        self.post(
            "/api/purchasing/purchase-orders/approve",
            json!({
                "organization_id": self.org,
                "purchase_order_id": order,
                "approver_id": approver
            }),
        )
        .await
    }

    async fn reject(&self, order: Uuid, approver: Uuid, reason: &str) -> (StatusCode, Value) {
        self.post(
            "/api/purchasing/purchase-orders/reject",
            json!({
                "organization_id": self.org,
                "purchase_order_id": order,
                "approver_id": approver,
                "reason": reason
            }),
        )
        .await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(self.app(), request).await
    }
}

async fn organization(pool: &PgPool, name: &str) -> Uuid {
    OrganizationRepo::new(pool)
        .create(
            &OrganizationName::new(name).unwrap(),
            "restaurant",
            None,
            &json!({}),
        )
        .await
        .unwrap()
        .id
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
#[ignore = "requires database"]
async fn manager_escalates_and_owner_approves() {
    let fx = Fixture::new("Approval Flow").await;
    let manager = fx.user(fx.org, "Marco", "manager").await;
    let owner = fx.user(fx.org, "Olivia", "owner").await;
    let order = fx.order(THRESHOLD_CENTS * 5).await;

    let (status, body) = fx.approve(order, manager).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "escalated");
    assert_eq!(body["approved_by"], Value::Null);
    assert_eq!(body["approved_at"], Value::Null);
    assert!(body["notes"].as_str().unwrap().starts_with("Escalated by"));

    let (status, body) = fx.approve(order, manager).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, body) = fx.approve(order, owner).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");
    assert_eq!(body["approved_by"], owner.to_string());
    assert!(body["approved_at"].is_string());

    let (status, _) = fx.approve(order, owner).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "requires database"]
async fn manager_approves_within_limit() {
    let fx = Fixture::new("Approval Small").await;
    let manager = fx.user(fx.org, "Mina", "manager").await;
    let order = fx.order(THRESHOLD_CENTS).await;

    let (status, body) = fx.approve(order, manager).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");
    assert_eq!(body["approved_by"], manager.to_string());
}

#[tokio::test]
#[ignore = "requires database"]
async fn approvers_without_authority_are_403() {
    let fx = Fixture::new("Approval Roles").await;
    let staff = fx.user(fx.org, "Sam", "staff").await;
    let nobody = fx.user_without_role("Nora").await;
    let order = fx.order(500).await;

    let (status, body) = fx.approve(order, staff).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "staff cannot approve purchase orders");

    let (status, body) = fx.approve(order, nobody).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "approver has no role");

    let (status, _) = fx.reject(order, staff, "not needed").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let order_status = TransactionRepo::new(&fx.pool)
        .get(fx.org, order)
        .await
        .unwrap()
        .status;
    assert_eq!(order_status, "pending_approval");
}

#[tokio::test]
#[ignore = "requires database"]
async fn other_organizations_are_404() {
    let fx = Fixture::new("Approval Home").await;
    let elsewhere = organization(&fx.pool, "Approval Elsewhere").await;
    let outsider = fx.user(elsewhere, "Otto", "owner").await;
    let owner = fx.user(fx.org, "Ophelia", "owner").await;
    let order = fx.order(500).await;

    let (status, body) = fx.approve(order, outsider).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = fx
        .post(
            "/api/purchasing/purchase-orders/approve",
            json!({
                "organization_id": elsewhere,
                "purchase_order_id": order,
                "approver_id": outsider
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let detail = |org: Uuid| {
        Request::builder()
            .uri(format!(
                "/api/purchasing/purchase-orders/{order}?organization_id={org}"
            ))
            .body(Body::empty())
            .unwrap()
    };
    let (status, _) = send(fx.app(), detail(elsewhere)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = send(fx.app(), detail(fx.org)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lines"][0]["description"], "Parmigiano wheel");

    let (status, _) = fx.approve(order, owner).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires database"]
async fn rejection_records_reason_and_is_final() {
    let fx = Fixture::new("Approval Reject").await;
    let manager = fx.user(fx.org, "Mats", "manager").await;
    let order = fx.order(THRESHOLD_CENTS * 2).await;

    let (status, body) = fx.approve(order, manager).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "escalated");

    let (status, body) = fx.reject(order, manager, "supplier price too high").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["approved_by"], manager.to_string());
    assert!(body["notes"]
        .as_str()
        .unwrap()
        .ends_with("Rejected: supplier price too high"));

    let (status, _) = fx.reject(order, manager, "again").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = fx.reject(fx.order(500).await, manager, "   ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}
