//! Relationship endpoints

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::db::{NewRelationship, Relationship, RelationshipRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, ValidPath};
use crate::http::server::AppState;
use crate::models::validation::storable_json;
use crate::models::{RelationshipType, ValidationError};

#[derive(Deserialize)]
pub struct CreateRelationshipRequest {
    pub source_entity_id: Uuid,
    pub target_entity_id: Uuid,
    pub relationship_type: String,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Serialize)]
pub struct RelationshipResponse {
    pub id: String,
    pub source_entity_id: String,
    pub target_entity_id: String,
    pub relationship_type: String,
    pub metadata: Value,
    pub created_at: String,
}

impl From<Relationship> for RelationshipResponse {
    fn from(r: Relationship) -> Self {
        Self {
            id: r.id.to_string(),
            source_entity_id: r.source_entity_id.to_string(),
            target_entity_id: r.target_entity_id.to_string(),
            relationship_type: r.relationship_type,
            metadata: r.metadata,
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

/// POST /api/organizations/{org_id}/relationships
async fn create_relationship(
    State(state): State<Arc<AppState>>,
    ValidPath(org_id): ValidPath<Uuid>,
    JsonBody(req): JsonBody<CreateRelationshipRequest>,
) -> Result<(StatusCode, Json<RelationshipResponse>), ApiError> {
    if req.source_entity_id == req.target_entity_id {
        return Err(ValidationError::Rule {
            field: "target_entity_id".to_string(),
            message: "an entity cannot relate to itself".to_string(),
        }
        .into());
    }

    let metadata = match req.metadata {
        None => serde_json::json!({}),
        Some(v @ Value::Object(_)) => {
            storable_json(&v, "metadata")?;
            v
        }
        Some(_) => {
            return Err(ValidationError::InvalidFormat {
                field: "metadata",
                reason: "must be a JSON object",
            }
            .into())
        }
    };

    let new = NewRelationship {
        source_entity_id: req.source_entity_id,
        target_entity_id: req.target_entity_id,
        relationship_type: RelationshipType::new(&req.relationship_type)?,
        metadata,
    };

    let rel = RelationshipRepo::new(&state.pool).create(org_id, &new).await?;
    Ok((StatusCode::CREATED, Json(rel.into())))
}

/// DELETE /api/organizations/{org_id}/relationships/{relationship_id}
async fn delete_relationship(
    State(state): State<Arc<AppState>>,
    ValidPath((org_id, relationship_id)): ValidPath<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    RelationshipRepo::new(&state.pool)
        .deactivate(org_id, relationship_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/organizations/{org_id}/entities/{entity_id}/relationships
async fn list_entity_relationships(
    State(state): State<Arc<AppState>>,
    ValidPath((org_id, entity_id)): ValidPath<(Uuid, Uuid)>,
) -> Result<Json<Vec<RelationshipResponse>>, ApiError> {
    let rels = RelationshipRepo::new(&state.pool)
        .list_for_entity(org_id, entity_id)
        .await?;
    Ok(Json(rels.into_iter().map(RelationshipResponse::from).collect()))
}

/// Relationship routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/organizations/{org_id}/relationships",
            post(create_relationship),
        )
        .route(
            "/api/organizations/{org_id}/relationships/{relationship_id}",
            delete(delete_relationship),
        )
        .route(
            "/api/organizations/{org_id}/entities/{entity_id}/relationships",
            get(list_entity_relationships),
        )
}
