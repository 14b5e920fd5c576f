//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Error bodies are JSON: `{"error": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use forno_core::DeliveryValidation;
use forno_settings::SettingsError;
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::search::SearchError;
use crate::services::PlaceOrderError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Settings store operation failed.
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Search index operation failed.
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The delivery address was checked and cannot be served.
    #[error("Delivery rejected")]
    DeliveryRejected(Box<DeliveryValidation>),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PlaceOrderError> for AppError {
    fn from(err: PlaceOrderError) -> Self {
        match err {
            PlaceOrderError::Database(RepositoryError::NotFound) => {
                Self::NotFound("product".to_string())
            }
            PlaceOrderError::Database(e) => Self::Database(e),
            PlaceOrderError::Delivery(validation) => Self::DeliveryRejected(validation),
            other @ (PlaceOrderError::Invalid(_)
            | PlaceOrderError::Phone(_)
            | PlaceOrderError::Items(_)) => Self::BadRequest(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Database(_) | Self::Settings(_) | Self::Search(_) | Self::Internal(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Settings(_) | Self::Search(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::BadRequest(_) | Self::DeliveryRejected(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let body = match self {
            Self::DeliveryRejected(validation) => json!(validation),
            Self::Database(RepositoryError::NotFound) => json!({ "error": "Not found" }),
            Self::Database(_) | Self::Settings(_) | Self::Search(_) | Self::Internal(_) => {
                json!({ "error": "Internal server error" })
            }
            Self::NotFound(what) => json!({ "error": format!("Not found: {what}") }),
            Self::BadRequest(message) => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
