//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use core_kernel::{AppError, ErrorCategory, ErrorKey};

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    /// Anything raised by the lifecycle service
    #[error(transparent)]
    App(#[from] AppError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error")]
    Validation(#[from] validator::ValidationErrors),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

/// HTTP status for an error category
pub fn status_for(category: ErrorCategory) -> StatusCode {
    match category {
        ErrorCategory::User => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCategory::NotFound => StatusCode::NOT_FOUND,
        ErrorCategory::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCategory::Forbidden => StatusCode::FORBIDDEN,
        ErrorCategory::Conflict => StatusCode::CONFLICT,
        ErrorCategory::Database | ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, key, message, details) = match self {
            ApiError::App(err) => {
                let status = status_for(err.category);
                if status.is_server_error() {
                    error!(key = %err.key, message = %err.message, "request failed");
                }
                (status, err.key, err.message, None)
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorKey::InvalidInput, msg, None),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorKey::NotAuthorized,
                "Unauthorized".to_string(),
                None,
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorKey::Forbidden, msg, None),
            ApiError::Validation(errors) => {
                let details = errors
                    .field_errors()
                    .iter()
                    .map(|(field, errs)| {
                        let codes: Vec<&str> = errs.iter().map(|e| e.code.as_ref()).collect();
                        format!("{}: {}", field, codes.join(", "))
                    })
                    .collect();
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    ErrorKey::Validation,
                    "Request validation failed".to_string(),
                    Some(details),
                )
            }
        };

        let body = ErrorResponse {
            error: key.as_str().to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}
