//! Unified error handling for admin.
//!
//! Error bodies are JSON: `{"error": "..."}`. Server-side failures are
//! captured to Sentry and never shown to the caller in detail.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use forno_settings::SettingsError;
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::CatalogError;
use crate::storage::StorageError;

/// Application-level error type for the admin API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Settings store operation failed.
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Object storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Database(e) => Self::Database(e),
            CatalogError::Storage(e) => Self::Storage(e),
        }
    }
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Storage(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Settings(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(message)) | Self::BadRequest(message) => message,
            Self::Storage(e) if e.is_client_error() => e.to_string(),
            Self::Storage(_) => "Image storage is unavailable".to_string(),
            Self::Database(_) | Self::Settings(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::NotFound(what) => format!("Not found: {what}"),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
