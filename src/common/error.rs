// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Every failure a handler can return ends up here.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    // A field that arrived in the wrong format (e.g. an unparseable date).
    #[error("Invalid value for '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Unknown permission keys")]
    UnknownPermissionKeys(Vec<String>),

    #[error("{entity} is still referenced")]
    StillReferenced { entity: String, references: i64 },

    // Foreign key / check violations reported by the database.
    #[error("{0}")]
    ConstraintViolation(String),

    // Unique violations reported by the database.
    #[error("{0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid or missing authentication token")]
    InvalidToken,

    #[error("{0}")]
    RateLimited(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

impl AppError {
    pub fn not_found(entity: &str) -> Self {
        AppError::NotFound(entity.to_string())
    }

    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        AppError::InvalidField {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::BadRequest(_)
            | AppError::InvalidField { .. }
            | AppError::UnknownPermissionKeys(_)
            | AppError::StillReferenced { .. }
            | AppError::ConstraintViolation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::BTreeMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                json!({
                    "error": "One or more fields are invalid.",
                    "details": details,
                })
            }
            AppError::InvalidField { field, message } => json!({
                "error": message,
                "hint": format!("check the '{}' field", field),
            }),
            AppError::UnknownPermissionKeys(keys) => json!({
                "error": "Some permission keys do not match any menu.",
                "unknown_keys": keys,
            }),
            AppError::StillReferenced { entity, references } => json!({
                "error": format!("{} cannot be deleted while it is referenced.", entity),
                "references": references,
            }),
            AppError::DatabaseError(sqlx::Error::RowNotFound) => {
                json!({ "error": "Record not found" })
            }
            ref e if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("Internal server error: {}", e);
                json!({
                    "error": "An unexpected error occurred.",
                    "detail": e.to_string(),
                })
            }
            e => json!({ "error": e.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_of(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn unknown_keys_are_listed() {
        let (status, body) =
            body_of(AppError::UnknownPermissionKeys(vec!["Reports".into()])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["unknown_keys"][0], "Reports");
    }

    #[tokio::test]
    async fn still_referenced_carries_count() {
        let (status, body) = body_of(AppError::StillReferenced {
            entity: "Series".into(),
            references: 3,
        })
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["references"], 3);
    }

    #[tokio::test]
    async fn invalid_field_has_hint() {
        let (status, body) =
            body_of(AppError::invalid_field("joining_date", "expected YYYY-MM-DD")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "expected YYYY-MM-DD");
        assert!(body["hint"].as_str().unwrap().contains("joining_date"));
    }

    #[tokio::test]
    async fn row_not_found_is_404() {
        let (status, _) = body_of(AppError::DatabaseError(sqlx::Error::RowNotFound)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn internal_errors_pass_the_message_through() {
        let (status, body) =
            body_of(AppError::InternalServerError(anyhow::anyhow!("disk full"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().contains("disk full"));
    }

    #[tokio::test]
    async fn conflict_is_409() {
        let (status, body) = body_of(AppError::Conflict("email already exists".into())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "email already exists");
    }
}
