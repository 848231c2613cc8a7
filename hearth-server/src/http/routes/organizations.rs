//! Organization endpoints

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::{Organization, OrganizationRepo, OrganizationUpdate};
use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, ValidUuid};
use crate::http::server::AppState;
use crate::models::validation::{bounded_text, storable_json};
use crate::models::{OrganizationName, Paginated, Pagination, ValidationError};
use crate::services::{Deployment, TemplateDeployer};

const MAX_LABEL_LEN: usize = 64;

#[derive(Deserialize)]
pub struct CreateOrganizationRequest {
    pub organization_name: String,
    pub organization_type: Option<String>,
    pub industry: Option<String>,
    pub settings: Option<Value>,
}

#[derive(Deserialize)]
pub struct UpdateOrganizationRequest {
    pub organization_name: Option<String>,
    pub industry: Option<String>,
    pub settings: Option<Value>,
}

#[derive(Deserialize)]
pub struct CloneOrganizationRequest {
    pub organization_name: String,
}

#[derive(Deserialize)]
pub struct ListOrganizationsParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Serialize)]
pub struct OrganizationResponse {
    pub id: String,
    pub organization_name: String,
    pub organization_code: String,
    pub organization_type: String,
    pub industry: Option<String>,
    pub settings: Value,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Organization> for OrganizationResponse {
    fn from(o: Organization) -> Self {
        Self {
            id: o.id.to_string(),
            organization_name: o.organization_name,
            organization_code: o.organization_code,
            organization_type: o.organization_type,
            industry: o.industry,
            settings: o.settings,
            is_active: o.is_active,
            created_at: o.created_at.to_rfc3339(),
            updated_at: o.updated_at.to_rfc3339(),
        }
    }
}

fn validate_settings(settings: Option<Value>) -> Result<Option<Value>, ValidationError> {
    match settings {
        None => Ok(None),
        Some(v @ Value::Object(_)) => {
            storable_json(&v, "settings")?;
            Ok(Some(v))
        }
        Some(_) => Err(ValidationError::InvalidFormat {
            field: "settings",
            reason: "must be a JSON object",
        }),
    }
}

fn validate_label(value: Option<&str>, field: &'static str) -> Result<Option<String>, ValidationError> {
    value.map(|v| bounded_text(v, field, MAX_LABEL_LEN)).transpose()
}

/// GET /api/core/organizations
async fn list_organizations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListOrganizationsParams>,
) -> Result<Json<Paginated<OrganizationResponse>>, ApiError> {
    let page = Pagination::new(params.page.unwrap_or(1), params.per_page.unwrap_or(20));
    let result = OrganizationRepo::new(&state.pool)
        .list(page, params.include_inactive)
        .await?;

    Ok(Json(result.map(OrganizationResponse::from)))
}

/// POST /api/core/organizations
async fn create_organization(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<CreateOrganizationRequest>,
) -> Result<(StatusCode, Json<OrganizationResponse>), ApiError> {
    let name = OrganizationName::new(&req.organization_name)?;
    let organization_type = validate_label(req.organization_type.as_deref(), "organization_type")?
        .unwrap_or_else(|| "restaurant".to_string());
    let industry = validate_label(req.industry.as_deref(), "industry")?;
    let settings = validate_settings(req.settings)?.unwrap_or_else(|| serde_json::json!({}));

    let org = OrganizationRepo::new(&state.pool)
        .create(&name, &organization_type, industry.as_deref(), &settings)
        .await?;

    Ok((StatusCode::CREATED, Json(org.into())))
}

/// GET /api/organizations/{org_id}
async fn get_organization(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<OrganizationResponse>, ApiError> {
    let org = OrganizationRepo::new(&state.pool).get(id).await?;
    Ok(Json(org.into()))
}

/// PUT /api/organizations/{org_id}
async fn update_organization(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    JsonBody(req): JsonBody<UpdateOrganizationRequest>,
) -> Result<Json<OrganizationResponse>, ApiError> {
    let update = OrganizationUpdate {
        name: req
            .organization_name
            .as_deref()
            .map(OrganizationName::new)
            .transpose()?,
        industry: validate_label(req.industry.as_deref(), "industry")?,
        settings: validate_settings(req.settings)?,
    };

    let org = OrganizationRepo::new(&state.pool).update(id, update).await?;
    Ok(Json(org.into()))
}

/// DELETE /api/organizations/{org_id}
async fn delete_organization(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<StatusCode, ApiError> {
    OrganizationRepo::new(&state.pool).deactivate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/organizations/{org_id}/clone
async fn clone_organization(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    JsonBody(req): JsonBody<CloneOrganizationRequest>,
) -> Result<(StatusCode, Json<Deployment>), ApiError> {
    let name = OrganizationName::new(&req.organization_name)?;
    let deployment = TemplateDeployer::new(&state.pool)
        .clone_organization(id, &name)
        .await?;

    Ok((StatusCode::CREATED, Json(deployment)))
}

/// Organization routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/core/organizations",
            get(list_organizations).post(create_organization),
        )
        .route(
            "/api/organizations/{org_id}",
            get(get_organization)
                .put(update_organization)
                .delete(delete_organization),
        )
        .route("/api/organizations/{org_id}/clone", post(clone_organization))
}
