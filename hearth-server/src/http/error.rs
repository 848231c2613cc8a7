//! API error type with IntoResponse
//!
//! Every failure leaves as `{"error": kind, "message": text}`. Database and
//! internal errors are logged and answered with a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hearth_core::{BulkError, HearthError};
use serde_json::json;

use crate::db::DbError;
use crate::models::ValidationError;
use crate::services::DeployError;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Field validation failed (400)
    Validation(ValidationError),

    /// Malformed request or rejected reference (400)
    BadRequest { message: String },

    /// Resource not found, or in another organization (404)
    NotFound { resource: &'static str, id: String },

    /// Approver lacks authority (403)
    Forbidden { reason: String },

    /// Duplicate or invalid status transition (409)
    Conflict { message: String },

    /// Bulk batch over the configured limit (413)
    PayloadTooLarge { message: String },

    /// Database error (500, logged)
    Database(DbError),

    /// Internal error (500, logged)
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Database(_) | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (kind, message) = match self {
            Self::Validation(e) => ("validation_error", e.to_string()),
            Self::BadRequest { message } => ("bad_request", message),
            Self::NotFound { resource, id } => {
                ("not_found", format!("{} '{}' not found", resource, id))
            }
            Self::Forbidden { reason } => ("forbidden", reason),
            Self::Conflict { message } => ("conflict", message),
            Self::PayloadTooLarge { message } => ("payload_too_large", message),
            Self::Database(e) => {
                tracing::error!("Database error: {}", e);
                ("internal_error", "an internal error occurred".to_string())
            }
            Self::Internal { message } => {
                tracing::error!("Internal error: {}", message);
                ("internal_error", "an internal error occurred".to_string())
            }
        };

        (status, Json(json!({ "error": kind, "message": message }))).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { resource, id } => Self::NotFound { resource, id },
            DbError::Conflict(message) => Self::Conflict { message },
            DbError::InvalidReference(message) => Self::BadRequest { message },
            DbError::Sqlx(_) => Self::Database(e),
        }
    }
}

impl From<HearthError> for ApiError {
    fn from(e: HearthError) -> Self {
        match e {
            HearthError::InvalidTransition { .. } => Self::Conflict {
                message: e.to_string(),
            },
            HearthError::Validation { .. } => Self::BadRequest {
                message: e.to_string(),
            },
            other => Self::Internal {
                message: other.to_string(),
            },
        }
    }
}

impl From<BulkError> for ApiError {
    fn from(e: BulkError) -> Self {
        match e {
            BulkError::TooMany { .. } => Self::PayloadTooLarge {
                message: e.to_string(),
            },
            BulkError::UnknownKind(_) | BulkError::Empty => Self::BadRequest {
                message: e.to_string(),
            },
        }
    }
}

impl From<DeployError> for ApiError {
    fn from(e: DeployError) -> Self {
        match e {
            DeployError::Validation(v) => v.into(),
            DeployError::Db(d) => d.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_error_is_400() {
        let (status, body) =
            body_json(ApiError::Validation(ValidationError::Empty { field: "name" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["message"], "name cannot be empty");
    }

    #[tokio::test]
    async fn not_found_is_404() {
        let err: ApiError = DbError::not_found("entity", "abc").into();
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "entity 'abc' not found");
    }

    #[tokio::test]
    async fn invalid_transition_is_409() {
        let err: ApiError = HearthError::InvalidTransition {
            from: "approved".into(),
            action: "reject",
        }
        .into();
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Cannot reject a purchase order that is approved");
    }

    #[tokio::test]
    async fn oversized_batch_is_413() {
        let err: ApiError = BulkError::TooMany { count: 5, max: 2 }.into();
        let (status, _) = body_json(err).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn database_error_hides_details() {
        let err: ApiError = DbError::Sqlx(sqlx::Error::PoolTimedOut).into();
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "an internal error occurred");
    }

    #[tokio::test]
    async fn forbidden_is_403() {
        let (status, _) = body_json(ApiError::Forbidden {
            reason: "staff cannot approve purchase orders".into(),
        })
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
