//! Organization repository
//!
//! - create: generated code, retried on collision via ON CONFLICT DO NOTHING
//! - list/get: active organizations only unless asked
//! - deactivate: soft delete

use chrono::{DateTime, Utc};
use hearth_core::organization_code;
use sqlx::{FromRow, PgConnection, PgPool, Row};
use uuid::Uuid;

use super::DbError;
use crate::models::{OrganizationName, Paginated, Pagination};

/// Attempts before giving up on generating a free organization code
const CODE_ATTEMPTS: usize = 3;

const ORG_COLUMNS: &str = "id, organization_name, organization_code, organization_type, \
                           industry, settings, is_active, created_at, updated_at";

/// Organization record from database
#[derive(Debug, Clone, FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub organization_name: String,
    pub organization_code: String,
    pub organization_type: String,
    pub industry: Option<String>,
    pub settings: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct OrganizationUpdate {
    pub name: Option<OrganizationName>,
    pub industry: Option<String>,
    pub settings: Option<serde_json::Value>,
}

/// Insert an organization on an open connection, generating its code.
pub(crate) async fn insert_organization(
    conn: &mut PgConnection,
    name: &OrganizationName,
    organization_type: &str,
    industry: Option<&str>,
    settings: &serde_json::Value,
) -> Result<Organization, DbError> {
    for attempt in 1..=CODE_ATTEMPTS {
        let code = organization_code(name.as_str(), &mut rand::thread_rng());

        let inserted: Option<Organization> = sqlx::query_as(&format!(
            r#"
            INSERT INTO core_organizations
                (organization_name, organization_code, organization_type, industry, settings)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (organization_code) DO NOTHING
            RETURNING {ORG_COLUMNS}
            "#
        ))
        .bind(name.as_str())
        .bind(&code)
        .bind(organization_type)
        .bind(industry)
        .bind(settings)
        .fetch_optional(&mut *conn)
        .await?;

        match inserted {
            Some(org) => return Ok(org),
            None => tracing::debug!(%code, attempt, "organization code collision, retrying"),
        }
    }

    Err(DbError::Conflict(format!(
        "could not generate a unique code for '{}'",
        name.as_str()
    )))
}

/// Fail with NotFound unless the organization exists and is active.
pub(crate) async fn ensure_active(conn: &mut PgConnection, id: Uuid) -> Result<(), DbError> {
    let (exists,): (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM core_organizations WHERE id = $1 AND is_active)",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;

    if exists {
        Ok(())
    } else {
        Err(DbError::not_found("organization", id))
    }
}

/// Organization repository
pub struct OrganizationRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> OrganizationRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an organization with a generated code.
    pub async fn create(
        &self,
        name: &OrganizationName,
        organization_type: &str,
        industry: Option<&str>,
        settings: &serde_json::Value,
    ) -> Result<Organization, DbError> {
        let mut conn = self.pool.acquire().await?;
        let org = insert_organization(&mut conn, name, organization_type, industry, settings).await?;

        tracing::info!(id = %org.id, code = %org.organization_code, "organization created");
        Ok(org)
    }

    /// List organizations, newest first.
    pub async fn list(
        &self,
        page: Pagination,
        include_inactive: bool,
    ) -> Result<Paginated<Organization>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORG_COLUMNS}, COUNT(*) OVER() AS total
            FROM core_organizations
            WHERE is_active OR $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(include_inactive)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(Organization::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(page.wrap(items, total))
    }

    /// Get an active organization by id.
    pub async fn get(&self, id: Uuid) -> Result<Organization, DbError> {
        sqlx::query_as(&format!(
            "SELECT {ORG_COLUMNS} FROM core_organizations WHERE id = $1 AND is_active"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("organization", id))
    }

    /// Apply a partial update.
    pub async fn update(&self, id: Uuid, update: OrganizationUpdate) -> Result<Organization, DbError> {
        sqlx::query_as(&format!(
            r#"
            UPDATE core_organizations SET
                organization_name = COALESCE($2, organization_name),
                industry = COALESCE($3, industry),
                settings = COALESCE($4, settings),
                updated_at = NOW()
            WHERE id = $1 AND is_active
            RETURNING {ORG_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.name.as_ref().map(OrganizationName::as_str))
        .bind(update.industry.as_deref())
        .bind(update.settings)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("organization", id))
    }

    /// Soft delete.
    pub async fn deactivate(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query(
            "UPDATE core_organizations SET is_active = FALSE, updated_at = NOW() \
             WHERE id = $1 AND is_active",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("organization", id));
        }

        tracing::info!(%id, "organization deactivated");
        Ok(())
    }
}
