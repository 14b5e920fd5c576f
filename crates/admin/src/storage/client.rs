//! Storage REST client.

use std::time::Duration;

use forno_core::ProductId;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::error::StorageError;
use crate::config::StorageConfig;

/// Largest accepted image (5 MiB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Uploads are tried this many times in total.
pub const UPLOAD_ATTEMPTS: u32 = 3;

const RETRY_PAUSE: Duration = Duration::from_millis(500);

/// Per-request limit, covering the whole upload body.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Accepted image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Jpeg,
    Png,
    Webp,
    Gif,
}

impl ImageType {
    /// Parse a MIME type, ignoring parameters and case.
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Gif => "gif",
        }
    }
}

/// Object storage client.
#[derive(Clone)]
pub struct StorageClient {
    client: Client,
    base_url: String,
    service_key: SecretString,
    bucket: String,
}

impl std::fmt::Debug for StorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageClient")
            .field("base_url", &self.base_url)
            .field("service_key", &"[REDACTED]")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl StorageClient {
    /// Create a new storage client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        Self::with_timeout(config, REQUEST_TIMEOUT)
    }

    fn with_timeout(config: &StorageConfig, timeout: Duration) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            service_key: config.service_key.clone(),
            bucket: config.bucket.clone(),
        })
    }

    /// A fresh object path for a product image. Every upload gets a new
    /// name so CDNs never serve a stale picture.
    #[must_use]
    pub fn product_image_path(product_id: ProductId, image_type: ImageType) -> String {
        format!(
            "products/{product_id}/{}.{}",
            Uuid::new_v4().simple(),
            image_type.extension()
        )
    }

    /// Public URL for an object path.
    #[must_use]
    pub fn public_url(&self, path: &str) -> String {
        format!("{}/object/public/{}/{path}", self.base_url, self.bucket)
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/object/{}/{path}", self.base_url, self.bucket)
    }

    /// Check size and type before anything is sent.
    ///
    /// # Errors
    ///
    /// Returns a client error for empty, oversized or non-image files.
    pub fn validate(data: &[u8], content_type: &str) -> Result<ImageType, StorageError> {
        let image_type = ImageType::from_content_type(content_type)
            .ok_or_else(|| StorageError::UnsupportedType(content_type.to_string()))?;
        if data.is_empty() {
            return Err(StorageError::Empty);
        }
        if data.len() > MAX_IMAGE_BYTES {
            return Err(StorageError::TooLarge {
                size: data.len(),
                limit: MAX_IMAGE_BYTES,
            });
        }
        Ok(image_type)
    }

    /// Upload `data` to `path`, replacing any existing object.
    ///
    /// Transport errors, 5xx and 429 answers are retried up to
    /// [`UPLOAD_ATTEMPTS`] times with a fixed pause. Other 4xx answers fail
    /// at once.
    ///
    /// # Errors
    ///
    /// Returns the validation error, or the last failure once attempts run out.
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub async fn upload(&self, path: &str, data: &[u8], image_type: ImageType) -> Result<(), StorageError> {
        let mut attempt = 1;
        loop {
            match self.try_upload(path, data, image_type).await {
                Ok(()) => {
                    debug!(attempt, "Image uploaded");
                    return Ok(());
                }
                Err(e) if attempt < UPLOAD_ATTEMPTS && is_retryable(&e) => {
                    warn!(error = %e, attempt, "Image upload failed, retrying");
                    attempt += 1;
                    tokio::time::sleep(RETRY_PAUSE).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_upload(&self, path: &str, data: &[u8], image_type: ImageType) -> Result<(), StorageError> {
        let response = self
            .client
            .post(self.object_url(path))
            .bearer_auth(self.service_key.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, image_type.content_type())
            .header("x-upsert", "true")
            .body(data.to_vec())
            .send()
            .await?;

        check_status(response).await
    }

    /// Delete the object at `path`. A missing object counts as deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or storage answers with an error.
    #[instrument(skip(self))]
    pub async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let response = self
            .client
            .delete(self.object_url(path))
            .bearer_auth(self.service_key.expose_secret())
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("Object already gone");
            return Ok(());
        }
        check_status(response).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<(), StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let message = response.text().await.unwrap_or_default();
    Err(StorageError::Status {
        status: status.as_u16(),
        message,
    })
}

fn is_retryable(err: &StorageError) -> bool {
    match err {
        StorageError::Request(_) => true,
        StorageError::Status { status, .. } => *status >= 500 || *status == 429,
        _ => false,
    }
}
