//! In-process bulk upload
//!
//! Each record goes through the same validation and repository call as a
//! single create request. Record failures land in the report, including
//! values Postgres refuses. Only an unknown organization or a lost
//! connection fails the whole batch.

use hearth_core::{BulkRecord, BulkReport};
use sqlx::PgPool;
use uuid::Uuid;

use super::inputs::{entity_from_record, user_from_record};
use crate::db::{DbError, EntityRepo, OrganizationRepo};

/// Create every parsed record, collecting a per-record report.
pub async fn upload(
    pool: &PgPool,
    organization_id: Uuid,
    records: Vec<Result<BulkRecord, String>>,
) -> Result<BulkReport, DbError> {
    OrganizationRepo::new(pool).get(organization_id).await?;

    let repo = EntityRepo::new(pool);
    let mut report = BulkReport::new(records.len());

    for (index, record) in records.into_iter().enumerate() {
        let new = match record {
            Ok(BulkRecord::Entity(entity)) => entity_from_record(&entity),
            Ok(BulkRecord::User(user)) => user_from_record(&user),
            Err(message) => {
                report.record_failure(index, message);
                continue;
            }
        };

        let new = match new {
            Ok(new) => new,
            Err(e) => {
                report.record_failure(index, e.to_string());
                continue;
            }
        };

        match repo.create(organization_id, &new).await {
            Ok(_) => report.record_created(),
            Err(e) if e.is_unavailable() => return Err(e),
            Err(DbError::Sqlx(e)) => {
                tracing::warn!(index, error = %e, "bulk record rejected by database");
                report.record_failure(index, "rejected by the database");
            }
            Err(e) => report.record_failure(index, e.to_string()),
        }
    }

    tracing::info!(
        %organization_id,
        total = report.total,
        created = report.created,
        failed = report.failed,
        "bulk upload finished"
    );
    Ok(report)
}
