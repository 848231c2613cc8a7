//! Bulk upload endpoint

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use hearth_core::{parse_records, BulkKind, BulkReport};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, ValidPath};
use crate::http::server::AppState;
use crate::services::bulk_upload;

#[derive(Deserialize)]
pub struct BulkUploadRequest {
    pub organization_id: Uuid,
    pub records: Vec<Value>,
}

/// POST /api/bulk-upload/{kind}
///
/// Batch problems (unknown kind, empty, over the limit) fail the request;
/// record problems are listed in the report.
async fn upload_batch(
    State(state): State<Arc<AppState>>,
    ValidPath(kind): ValidPath<String>,
    JsonBody(req): JsonBody<BulkUploadRequest>,
) -> Result<Json<BulkReport>, ApiError> {
    let kind: BulkKind = kind.parse()?;
    let parsed = parse_records(kind, req.records, state.config.bulk_upload.max_records)?;

    tracing::debug!(%kind, records = parsed.len(), organization_id = %req.organization_id, "bulk upload");
    let report = bulk_upload::upload(&state.pool, req.organization_id, parsed).await?;
    Ok(Json(report))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/bulk-upload/{kind}", post(upload_batch))
}
