//! User endpoints
//!
//! Users are `user` entities; `email` and `role` live in dynamic fields.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use hearth_core::UserRecord;
use serde::Serialize;
use uuid::Uuid;

use crate::db::{EntityFilter, EntityRepo, EntityWithFields};
use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, ValidPath};
use crate::http::server::AppState;
use crate::models::{EntityType, Paginated, Pagination, PaginationParams, USER_ENTITY_TYPE};
use crate::services::inputs::user_from_record;

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub status: String,
    pub created_at: String,
}

impl From<EntityWithFields> for UserResponse {
    fn from(e: EntityWithFields) -> Self {
        let text = |name: &str| {
            e.fields
                .iter()
                .find(|f| f.field_name == name)
                .and_then(|f| f.value.as_text())
                .map(str::to_string)
        };
        let email = text("email");
        let role = text("role");

        Self {
            id: e.entity.id.to_string(),
            name: e.entity.entity_name,
            email,
            role,
            status: e.entity.status,
            created_at: e.entity.created_at.to_rfc3339(),
        }
    }
}

/// GET /api/organizations/{org_id}/users
async fn list_users(
    State(state): State<Arc<AppState>>,
    ValidPath(org_id): ValidPath<Uuid>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Paginated<UserResponse>>, ApiError> {
    let filter = EntityFilter {
        entity_type: Some(EntityType::new(USER_ENTITY_TYPE)?),
        search: None,
    };

    let result = EntityRepo::new(&state.pool)
        .list(org_id, &filter, Pagination::from(params))
        .await?;
    Ok(Json(result.map(UserResponse::from)))
}

/// POST /api/organizations/{org_id}/users
async fn create_user(
    State(state): State<Arc<AppState>>,
    ValidPath(org_id): ValidPath<Uuid>,
    JsonBody(record): JsonBody<UserRecord>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let new = user_from_record(&record)?;
    let user = EntityRepo::new(&state.pool).create(org_id, &new).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// User routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/api/organizations/{org_id}/users",
        get(list_users).post(create_user),
    )
}
