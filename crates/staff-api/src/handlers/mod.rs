//! # HTTP Handlers
//!
//! REST endpoints for the employee directory plus health and banner routes.

pub mod employees;

use axum::http::Uri;
use axum::response::IntoResponse;

use crate::error::ApiError;

pub use employees::{
    create_employee, delete_employee, get_employee, list_employees, update_employee,
};

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    "OK"
}

/// Service banner
pub async fn banner() -> impl IntoResponse {
    "Employee Directory API"
}

/// JSON 404 for unmatched routes
pub async fn route_not_found(uri: Uri) -> ApiError {
    ApiError::NotFound {
        entity_type: "Route".to_string(),
        id: uri.path().to_string(),
    }
}
