//! Organization dashboard summary

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use hearth_core::PoStatus;
use serde::Serialize;

use crate::db::{EntityRepo, OrganizationRepo, StatusSummary, TransactionRepo};
use crate::http::error::ApiError;
use crate::http::extractors::ValidUuid;
use crate::http::routes::organizations::OrganizationResponse;
use crate::http::server::AppState;

#[derive(Serialize)]
pub struct PurchaseOrderSummary {
    pub count: i64,
    pub total_amount_cents: i64,
}

#[derive(Serialize)]
pub struct DashboardResponse {
    pub organization: OrganizationResponse,
    /// Active entities per `entity_type`
    pub entity_counts: BTreeMap<String, i64>,
    /// Purchase orders per status
    pub purchase_orders: BTreeMap<String, PurchaseOrderSummary>,
    pub pending_approvals: i64,
}

fn summarize_orders(rows: Vec<StatusSummary>) -> (BTreeMap<String, PurchaseOrderSummary>, i64) {
    let pending = rows
        .iter()
        .filter(|r| matches!(r.status.parse::<PoStatus>(), Ok(s) if !s.is_final()))
        .map(|r| r.count)
        .sum();

    let by_status = rows
        .into_iter()
        .map(|r| {
            (
                r.status,
                PurchaseOrderSummary {
                    count: r.count,
                    total_amount_cents: r.total_amount_cents,
                },
            )
        })
        .collect();

    (by_status, pending)
}

/// GET /api/organizations/{org_id}/summary
async fn summary(
    State(state): State<Arc<AppState>>,
    ValidUuid(org_id): ValidUuid,
) -> Result<Json<DashboardResponse>, ApiError> {
    let organization = OrganizationRepo::new(&state.pool).get(org_id).await?;
    let entity_counts = EntityRepo::new(&state.pool).count_by_type(org_id).await?;
    let orders = TransactionRepo::new(&state.pool).status_summary(org_id).await?;

    let (purchase_orders, pending_approvals) = summarize_orders(orders);

    Ok(Json(DashboardResponse {
        organization: organization.into(),
        entity_counts: entity_counts.into_iter().collect(),
        purchase_orders,
        pending_approvals,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/organizations/{org_id}/summary", get(summary))
}
