//! Entity endpoints: entities, their dynamic fields and metadata

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use hearth_core::EntityRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::db::{
    DynamicDataRepo, DynamicField, EntityFilter, EntityRepo, EntityUpdate, EntityWithFields,
    MetadataEntry, MetadataRepo,
};
use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, ValidPath};
use crate::http::server::AppState;
use crate::models::{
    EntityCode, EntityName, EntityType, FieldName, FieldValue, MetadataKey, Paginated,
    Pagination, ValidationError,
};
use crate::models::validation::{reject_nul, storable_json};
use crate::services::inputs::entity_from_record;

const MAX_STATUS_LEN: usize = 32;

#[derive(Deserialize)]
pub struct ListEntitiesParams {
    pub entity_type: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Deserialize)]
pub struct UpdateEntityRequest {
    pub entity_name: Option<String>,
    pub entity_code: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct SetFieldRequest {
    pub value: Value,
}

#[derive(Deserialize)]
pub struct PutMetadataRequest {
    pub value: Value,
}

/// Entity with its fields flattened into a JSON object
#[derive(Serialize)]
pub struct EntityResponse {
    pub id: String,
    pub organization_id: String,
    pub entity_type: String,
    pub entity_name: String,
    pub entity_code: Option<String>,
    pub status: String,
    pub fields: BTreeMap<String, Value>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<EntityWithFields> for EntityResponse {
    fn from(e: EntityWithFields) -> Self {
        let fields = e
            .fields
            .iter()
            .map(|f| (f.field_name.clone(), f.value.to_json()))
            .collect();
        let entity = e.entity;

        Self {
            id: entity.id.to_string(),
            organization_id: entity.organization_id.to_string(),
            entity_type: entity.entity_type,
            entity_name: entity.entity_name,
            entity_code: entity.entity_code,
            status: entity.status,
            fields,
            created_at: entity.created_at.to_rfc3339(),
            updated_at: entity.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct FieldResponse {
    pub field_name: String,
    pub field_type: &'static str,
    pub value: Value,
    pub updated_at: String,
}

impl From<DynamicField> for FieldResponse {
    fn from(f: DynamicField) -> Self {
        Self {
            field_type: f.value.field_type(),
            value: f.value.to_json(),
            field_name: f.field_name,
            updated_at: f.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct MetadataResponse {
    pub key: String,
    pub value: Value,
    pub updated_at: String,
}

impl From<MetadataEntry> for MetadataResponse {
    fn from(m: MetadataEntry) -> Self {
        Self {
            key: m.metadata_key,
            value: m.metadata_value,
            updated_at: m.updated_at.to_rfc3339(),
        }
    }
}

fn validate_status(status: Option<&str>) -> Result<Option<String>, ValidationError> {
    status
        .map(|s| crate::models::validation::bounded_text(s, "status", MAX_STATUS_LEN))
        .transpose()
}

/// GET /api/organizations/{org_id}/entities
async fn list_entities(
    State(state): State<Arc<AppState>>,
    ValidPath(org_id): ValidPath<Uuid>,
    Query(params): Query<ListEntitiesParams>,
) -> Result<Json<Paginated<EntityResponse>>, ApiError> {
    let search = params.search.filter(|s| !s.trim().is_empty());
    if let Some(search) = &search {
        reject_nul(search, "search")?;
    }
    let filter = EntityFilter {
        entity_type: params.entity_type.as_deref().map(EntityType::new).transpose()?,
        search,
    };
    let page = Pagination::new(params.page.unwrap_or(1), params.per_page.unwrap_or(20));

    let result = EntityRepo::new(&state.pool).list(org_id, &filter, page).await?;
    Ok(Json(result.map(EntityResponse::from)))
}

/// POST /api/organizations/{org_id}/entities
async fn create_entity(
    State(state): State<Arc<AppState>>,
    ValidPath(org_id): ValidPath<Uuid>,
    JsonBody(record): JsonBody<EntityRecord>,
) -> Result<(StatusCode, Json<EntityResponse>), ApiError> {
    let new = entity_from_record(&record)?;
    let created = EntityRepo::new(&state.pool).create(org_id, &new).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// GET /api/organizations/{org_id}/entities/{entity_id}
async fn get_entity(
    State(state): State<Arc<AppState>>,
    ValidPath((org_id, entity_id)): ValidPath<(Uuid, Uuid)>,
) -> Result<Json<EntityResponse>, ApiError> {
    let entity = EntityRepo::new(&state.pool).get(org_id, entity_id).await?;
    Ok(Json(entity.into()))
}

/// PUT /api/organizations/{org_id}/entities/{entity_id}
async fn update_entity(
    State(state): State<Arc<AppState>>,
    ValidPath((org_id, entity_id)): ValidPath<(Uuid, Uuid)>,
    JsonBody(req): JsonBody<UpdateEntityRequest>,
) -> Result<Json<EntityResponse>, ApiError> {
    let update = EntityUpdate {
        name: req.entity_name.as_deref().map(EntityName::new).transpose()?,
        code: EntityCode::optional(req.entity_code.as_deref())?,
        status: validate_status(req.status.as_deref())?,
    };

    let entity = EntityRepo::new(&state.pool)
        .update(org_id, entity_id, &update)
        .await?;
    Ok(Json(entity.into()))
}

/// DELETE /api/organizations/{org_id}/entities/{entity_id}
async fn delete_entity(
    State(state): State<Arc<AppState>>,
    ValidPath((org_id, entity_id)): ValidPath<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    EntityRepo::new(&state.pool).deactivate(org_id, entity_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/organizations/{org_id}/entities/{entity_id}/fields/{field}
async fn set_field(
    State(state): State<Arc<AppState>>,
    ValidPath((org_id, entity_id, field)): ValidPath<(Uuid, Uuid, String)>,
    JsonBody(req): JsonBody<SetFieldRequest>,
) -> Result<Json<FieldResponse>, ApiError> {
    let name = FieldName::new(&field)?;
    let value = FieldValue::from_json(req.value)?;

    let stored = DynamicDataRepo::new(&state.pool)
        .upsert(org_id, entity_id, &name, &value)
        .await?;
    Ok(Json(stored.into()))
}

/// DELETE /api/organizations/{org_id}/entities/{entity_id}/fields/{field}
async fn delete_field(
    State(state): State<Arc<AppState>>,
    ValidPath((org_id, entity_id, field)): ValidPath<(Uuid, Uuid, String)>,
) -> Result<StatusCode, ApiError> {
    let name = FieldName::new(&field)?;
    DynamicDataRepo::new(&state.pool)
        .delete(org_id, entity_id, &name)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/organizations/{org_id}/entities/{entity_id}/metadata
async fn list_metadata(
    State(state): State<Arc<AppState>>,
    ValidPath((org_id, entity_id)): ValidPath<(Uuid, Uuid)>,
) -> Result<Json<Vec<MetadataResponse>>, ApiError> {
    let entries = MetadataRepo::new(&state.pool)
        .list_for_entity(org_id, entity_id)
        .await?;
    Ok(Json(entries.into_iter().map(MetadataResponse::from).collect()))
}

/// GET /api/organizations/{org_id}/entities/{entity_id}/metadata/{key}
async fn get_metadata(
    State(state): State<Arc<AppState>>,
    ValidPath((org_id, entity_id, key)): ValidPath<(Uuid, Uuid, String)>,
) -> Result<Json<MetadataResponse>, ApiError> {
    let key = MetadataKey::new(&key)?;
    let entry = MetadataRepo::new(&state.pool)
        .get(org_id, entity_id, &key)
        .await?;
    Ok(Json(entry.into()))
}

/// PUT /api/organizations/{org_id}/entities/{entity_id}/metadata/{key}
async fn put_metadata(
    State(state): State<Arc<AppState>>,
    ValidPath((org_id, entity_id, key)): ValidPath<(Uuid, Uuid, String)>,
    JsonBody(req): JsonBody<PutMetadataRequest>,
) -> Result<Json<MetadataResponse>, ApiError> {
    let key = MetadataKey::new(&key)?;
    storable_json(&req.value, "value")?;
    let entry = MetadataRepo::new(&state.pool)
        .put(org_id, entity_id, &key, &req.value)
        .await?;
    Ok(Json(entry.into()))
}

/// Entity routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/organizations/{org_id}/entities",
            get(list_entities).post(create_entity),
        )
        .route(
            "/api/organizations/{org_id}/entities/{entity_id}",
            get(get_entity).put(update_entity).delete(delete_entity),
        )
        .route(
            "/api/organizations/{org_id}/entities/{entity_id}/fields/{field}",
            put(set_field).delete(delete_field),
        )
        .route(
            "/api/organizations/{org_id}/entities/{entity_id}/metadata",
            get(list_metadata),
        )
        .route(
            "/api/organizations/{org_id}/entities/{entity_id}/metadata/{key}",
            get(get_metadata).put(put_metadata),
        )
}
