//! Object storage errors.

use thiserror::Error;

/// Errors that can occur when talking to object storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The file is not one of the accepted image types.
    #[error("unsupported content type: {0}")]
    UnsupportedType(String),

    /// The file exceeds the upload limit.
    #[error("file is too large ({size} bytes, limit {limit})")]
    TooLarge { size: usize, limit: usize },

    /// The file is empty.
    #[error("file is empty")]
    Empty,

    /// HTTP request failed.
    #[error("storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Storage answered with an error status.
    #[error("storage returned {status}: {message}")]
    Status { status: u16, message: String },
}

impl StorageError {
    /// Whether the error is the caller's fault rather than the service's.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::UnsupportedType(_) | Self::TooLarge { .. } | Self::Empty)
    }
}
