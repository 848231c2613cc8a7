//! Purchase order endpoints
//!
//! Every route names the organization; an order or approver from another
//! organization is 404. Approval reads the approver's `role` field, asks
//! the approval policy for the next status and writes it with a
//! compare-and-set on the status that was read.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use hearth_core::{ApprovalDecision, ApprovalPolicy, ApproverRole, PoStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{
    DynamicDataRepo, NewPurchaseOrder, PurchaseOrderFilter, Transaction, TransactionLine,
    TransactionRepo, TransactionWithLines,
};
use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, ValidUuid};
use crate::http::server::AppState;
use crate::models::validation::bounded_text;
use crate::models::{OrderLineInput, OrderLines, Paginated, Pagination, USER_ENTITY_TYPE};

const MAX_NOTES_LEN: usize = 2000;

#[derive(Deserialize)]
pub struct CreatePurchaseOrderRequest {
    pub organization_id: Uuid,
    pub supplier_id: Option<Uuid>,
    pub notes: Option<String>,
    pub lines: Vec<OrderLineInput>,
}

#[derive(Deserialize)]
pub struct ListPurchaseOrdersParams {
    pub organization_id: Uuid,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Deserialize)]
pub struct OrganizationScope {
    pub organization_id: Uuid,
}

#[derive(Deserialize)]
pub struct ApproveRequest {
    pub organization_id: Uuid,
    pub purchase_order_id: Uuid,
    pub approver_id: Uuid,
}

#[derive(Deserialize)]
pub struct RejectRequest {
    pub organization_id: Uuid,
    pub purchase_order_id: Uuid,
    pub approver_id: Uuid,
    pub reason: String,
}

#[derive(Serialize)]
pub struct PurchaseOrderResponse {
    pub id: String,
    pub organization_id: String,
    pub transaction_code: String,
    pub supplier_id: Option<String>,
    pub status: String,
    pub total_amount_cents: i64,
    pub notes: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<String>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<LineResponse>>,
}

#[derive(Serialize)]
pub struct LineResponse {
    pub line_number: i32,
    pub entity_id: Option<String>,
    pub description: String,
    pub quantity: f64,
    pub unit_price_cents: i64,
    pub line_amount_cents: i64,
}

impl From<TransactionLine> for LineResponse {
    fn from(l: TransactionLine) -> Self {
        Self {
            line_number: l.line_number,
            entity_id: l.entity_id.map(|id| id.to_string()),
            description: l.description,
            quantity: l.quantity,
            unit_price_cents: l.unit_price_cents,
            line_amount_cents: l.line_amount_cents,
        }
    }
}

impl From<Transaction> for PurchaseOrderResponse {
    fn from(t: Transaction) -> Self {
        Self {
            id: t.id.to_string(),
            organization_id: t.organization_id.to_string(),
            transaction_code: t.transaction_code,
            supplier_id: t.reference_entity_id.map(|id| id.to_string()),
            status: t.status,
            total_amount_cents: t.total_amount_cents,
            notes: t.notes,
            approved_by: t.approved_by.map(|id| id.to_string()),
            approved_at: t.approved_at.map(|at| at.to_rfc3339()),
            created_at: t.created_at.to_rfc3339(),
            lines: None,
        }
    }
}

impl From<TransactionWithLines> for PurchaseOrderResponse {
    fn from(t: TransactionWithLines) -> Self {
        let lines = t.lines.into_iter().map(LineResponse::from).collect();
        Self {
            lines: Some(lines),
            ..Self::from(t.transaction)
        }
    }
}

/// GET /api/purchasing/purchase-orders?organization_id=..&status=..
async fn list_purchase_orders(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListPurchaseOrdersParams>,
) -> Result<Json<Paginated<PurchaseOrderResponse>>, ApiError> {
    let status = params
        .status
        .as_deref()
        .map(str::parse::<PoStatus>)
        .transpose()?;
    let filter = PurchaseOrderFilter {
        organization_id: params.organization_id,
        status,
    };
    let page = Pagination::new(params.page.unwrap_or(1), params.per_page.unwrap_or(20));

    let result = TransactionRepo::new(&state.pool).list(&filter, page).await?;
    Ok(Json(result.map(PurchaseOrderResponse::from)))
}

/// POST /api/purchasing/purchase-orders
async fn create_purchase_order(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<CreatePurchaseOrderRequest>,
) -> Result<(StatusCode, Json<PurchaseOrderResponse>), ApiError> {
    let new = NewPurchaseOrder {
        organization_id: req.organization_id,
        supplier_id: req.supplier_id,
        notes: req
            .notes
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .map(|n| bounded_text(n, "notes", MAX_NOTES_LEN))
            .transpose()?,
        lines: OrderLines::new(req.lines)?,
    };

    let po = TransactionRepo::new(&state.pool)
        .create_purchase_order(&new, &state.config.purchasing.code_prefix)
        .await?;
    Ok((StatusCode::CREATED, Json(po.into())))
}

/// GET /api/purchasing/purchase-orders/{id}?organization_id=..
async fn get_purchase_order(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    Query(scope): Query<OrganizationScope>,
) -> Result<Json<PurchaseOrderResponse>, ApiError> {
    let po = TransactionRepo::new(&state.pool)
        .get_with_lines(scope.organization_id, id)
        .await?;
    Ok(Json(po.into()))
}

/// Role of `approver_id` within the order's organization.
async fn approver_role(
    state: &AppState,
    order: &Transaction,
    approver_id: Uuid,
) -> Result<ApproverRole, ApiError> {
    let role = DynamicDataRepo::new(&state.pool)
        .text_field(order.organization_id, approver_id, USER_ENTITY_TYPE, "role")
        .await?;

    match role {
        Some(role) => Ok(role.parse()?),
        None => Err(ApiError::Forbidden {
            reason: "approver has no role".to_string(),
        }),
    }
}

/// Line appended to `notes` when the status changes
fn status_note(next: PoStatus, approver_id: Uuid, reason: Option<&str>) -> Option<String> {
    match next {
        PoStatus::Escalated => Some(format!(
            "Escalated by {}: over manager approval limit",
            approver_id
        )),
        PoStatus::Rejected => reason.map(|r| format!("Rejected: {}", r)),
        PoStatus::PendingApproval | PoStatus::Approved => None,
    }
}

fn not_authorized(role: ApproverRole, action: &str) -> ApiError {
    ApiError::Forbidden {
        reason: format!("{} cannot {} purchase orders", role, action),
    }
}

/// POST /api/purchasing/purchase-orders/approve
async fn approve_purchase_order(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<ApproveRequest>,
) -> Result<Json<PurchaseOrderResponse>, ApiError> {
    let repo = TransactionRepo::new(&state.pool);
    let order = repo.get(req.organization_id, req.purchase_order_id).await?;
    let current = order.po_status()?;
    let role = approver_role(&state, &order, req.approver_id).await?;

    let policy = ApprovalPolicy::new(state.config.purchasing.approval_threshold_cents);
    let next = match policy.decide(current, order.total_amount_cents, role)? {
        ApprovalDecision::Transition(next) => next,
        ApprovalDecision::NotAuthorized => return Err(not_authorized(role, "approve")),
    };

    if next == current {
        // A manager re-approving an escalated order changes nothing
        return Err(ApiError::Forbidden {
            reason: format!(
                "order total exceeds the {} approval limit; an owner must approve",
                role
            ),
        });
    }

    let note = status_note(next, req.approver_id, None);
    let updated = repo
        .set_status(
            order.organization_id,
            order.id,
            current,
            next,
            req.approver_id,
            note.as_deref(),
        )
        .await?;
    Ok(Json(updated.into()))
}

/// POST /api/purchasing/purchase-orders/reject
async fn reject_purchase_order(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<RejectRequest>,
) -> Result<Json<PurchaseOrderResponse>, ApiError> {
    let reason = bounded_text(&req.reason, "reason", MAX_NOTES_LEN)?;

    let repo = TransactionRepo::new(&state.pool);
    let order = repo.get(req.organization_id, req.purchase_order_id).await?;
    let current = order.po_status()?;
    let role = approver_role(&state, &order, req.approver_id).await?;

    let policy = ApprovalPolicy::new(state.config.purchasing.approval_threshold_cents);
    let next = match policy.reject(current, role)? {
        ApprovalDecision::Transition(next) => next,
        ApprovalDecision::NotAuthorized => return Err(not_authorized(role, "reject")),
    };

    let note = status_note(next, req.approver_id, Some(&reason));
    let updated = repo
        .set_status(
            order.organization_id,
            order.id,
            current,
            next,
            req.approver_id,
            note.as_deref(),
        )
        .await?;
    Ok(Json(updated.into()))
}

/// Purchasing routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/purchasing/purchase-orders",
            get(list_purchase_orders).post(create_purchase_order),
        )
        .route(
            "/api/purchasing/purchase-orders/approve",
            post(approve_purchase_order),
        )
        .route(
            "/api/purchasing/purchase-orders/reject",
            post(reject_purchase_order),
        )
        .route("/api/purchasing/purchase-orders/{id}", get(get_purchase_order))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn detail_response_includes_lines() {
        let id = Uuid::new_v4();
        let po = TransactionWithLines {
            transaction: Transaction {
                id,
                organization_id: Uuid::nil(),
                transaction_type: "purchase_order".into(),
                transaction_code: "PO-20260118-ZZ01".into(),
                reference_entity_id: None,
                status: "pending_approval".into(),
                total_amount_cents: 1250,
                notes: None,
                approved_by: None,
                approved_at: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            lines: vec![TransactionLine {
                id: Uuid::new_v4(),
                transaction_id: id,
                line_number: 1,
                entity_id: None,
                description: "Flour 25kg".into(),
                quantity: 1.0,
                unit_price_cents: 1250,
                line_amount_cents: 1250,
            }],
        };

        let json = serde_json::to_value(PurchaseOrderResponse::from(po)).unwrap();
        assert_eq!(json["lines"][0]["description"], "Flour 25kg");
        assert_eq!(json["total_amount_cents"], 1250);
    }

    #[test]
    fn notes_record_escalation_and_rejection() {
        let approver = Uuid::nil();
        assert_eq!(
            status_note(PoStatus::Escalated, approver, None).as_deref(),
            Some("Escalated by 00000000-0000-0000-0000-000000000000: over manager approval limit")
        );
        assert_eq!(
            status_note(PoStatus::Rejected, approver, Some("too expensive")).as_deref(),
            Some("Rejected: too expensive")
        );
        assert_eq!(status_note(PoStatus::Approved, approver, None), None);
    }

    #[test]
    fn list_response_omits_lines() {
        let t = Transaction {
            id: Uuid::new_v4(),
            organization_id: Uuid::nil(),
            transaction_type: "purchase_order".into(),
            transaction_code: "PO-20260118-ZZ02".into(),
            reference_entity_id: None,
            status: "approved".into(),
            total_amount_cents: 0,
            notes: None,
            approved_by: None,
            approved_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(PurchaseOrderResponse::from(t)).unwrap();
        assert!(json.get("lines").is_none());
    }
}
