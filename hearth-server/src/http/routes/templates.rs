//! Template endpoints

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use hearth_core::Template;
use serde::{Deserialize, Serialize};

use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, ValidPath};
use crate::http::server::AppState;
use crate::models::OrganizationName;
use crate::services::{Deployment, TemplateDeployer};

#[derive(Deserialize)]
pub struct DeployRequest {
    pub organization_name: String,
}

#[derive(Serialize)]
pub struct TemplateSummary {
    pub key: String,
    pub name: String,
    pub organization_type: String,
    pub entity_count: usize,
    pub relationship_count: usize,
}

impl From<&Template> for TemplateSummary {
    fn from(t: &Template) -> Self {
        Self {
            key: t.key.clone(),
            name: t.name.clone(),
            organization_type: t.organization_type.clone(),
            entity_count: t.entities.len(),
            relationship_count: t.relationships.len(),
        }
    }
}

/// GET /api/templates
async fn list_templates() -> Result<Json<Vec<TemplateSummary>>, ApiError> {
    let templates = Template::builtin_all()?;
    Ok(Json(templates.iter().map(TemplateSummary::from).collect()))
}

/// POST /api/templates/{key}/deploy
async fn deploy_template(
    State(state): State<Arc<AppState>>,
    ValidPath(key): ValidPath<String>,
    JsonBody(req): JsonBody<DeployRequest>,
) -> Result<(StatusCode, Json<Deployment>), ApiError> {
    let template = Template::builtin(&key)?.ok_or_else(|| ApiError::NotFound {
        resource: "template",
        id: key.clone(),
    })?;
    let name = OrganizationName::new(&req.organization_name)?;

    let deployment = TemplateDeployer::new(&state.pool)
        .deploy_template(&template, &name)
        .await?;
    Ok((StatusCode::CREATED, Json(deployment)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/templates", get(list_templates))
        .route("/api/templates/{key}/deploy", post(deploy_template))
}
