//! # API Error Types
//!
//! Unified error handling for the HTTP layer. Every error renders as the
//! JSON envelope `{"status": "error", "message": ..., "code": ...}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use staff_persistence::ServiceError;
use thiserror::Error;

/// Client-facing message for every 5xx response outside development
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal server error occurred.";

/// API-level errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{entity_type} '{id}' not found")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("{0}")]
    Service(ServiceError),
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::RateLimited(_) => "RATE_LIMITED",
            Self::Service(ServiceError::CacheInvalidation(_)) => "CACHE_ERROR",
            Self::Service(_) => "STORE_ERROR",
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound { id } => Self::NotFound {
                entity_type: "Employee".to_string(),
                id: id.to_string(),
            },
            ServiceError::Validation(e) => Self::InvalidInput(e.to_string()),
            fault => Self::Service(fault),
        }
    }
}

/// Internal detail of a 5xx response, carried as a response extension so a
/// development-only layer can reveal it
#[derive(Debug, Clone)]
pub struct FaultDetail {
    pub message: String,
    pub code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.to_string();

        let message = if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %detail, "API error");
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            detail.clone()
        };

        let body = serde_json::json!({
            "status": "error",
            "message": message,
            "code": self.error_code(),
        });

        let mut response = (status, axum::Json(body)).into_response();
        if status.is_server_error() {
            response.extensions_mut().insert(FaultDetail {
                message: detail,
                code: self.error_code(),
            });
        }
        response
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;
