//! Object storage for product images.
//!
//! Speaks the Supabase-style storage REST API:
//!
//! - `POST {base}/object/{bucket}/{path}` uploads (bearer service key)
//! - `DELETE {base}/object/{bucket}/{path}` removes
//! - `{base}/object/public/{bucket}/{path}` is the public URL

mod client;
mod error;

pub use client::{ImageType, MAX_IMAGE_BYTES, StorageClient, UPLOAD_ATTEMPTS};
pub use error::StorageError;
