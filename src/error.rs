//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::DomainError;
use crate::repository::RepositoryError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Authenticated caller required")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Repository errors
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        AppError::Repository(RepositoryError::Domain(err))
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, Option<String>) {
        match self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            // 401 Unauthorized
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),

            // 403 Forbidden
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", Some(msg.clone())),

            // Repository errors - map to appropriate HTTP status
            AppError::Repository(err) => match err {
                RepositoryError::Domain(domain_err) => match domain_err {
                    DomainError::InvalidIdentifier { value, .. } => {
                        (StatusCode::BAD_REQUEST, "invalid_identifier", Some(value.clone()))
                    }
                    DomainError::NotFound { id, .. } => {
                        (StatusCode::NOT_FOUND, "not_found", Some(id.clone()))
                    }
                    DomainError::ChildNotFound { child_id, .. } => {
                        tracing::error!(error = %domain_err, "Dangling child reference");
                        (StatusCode::CONFLICT, "child_not_found", Some(child_id.clone()))
                    }
                    DomainError::BusinessRuleViolation(msg) => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "business_rule_violation",
                        Some(msg.clone()),
                    ),
                },
                RepositoryError::Timeout(_) => {
                    tracing::error!(error = %err, "Storage deadline exceeded");
                    (StatusCode::GATEWAY_TIMEOUT, "timeout", None)
                }
                RepositoryError::Store(e) => {
                    tracing::error!("Store error: {:?}", e);
                    (StatusCode::INTERNAL_SERVER_ERROR, "store_error", None)
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = self.parts();

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
