//! Database operations for the admin API.
//!
//! # Schema: `forno`
//!
//! The admin owns every write to the catalog and delivery tables and manages
//! orders after they are placed:
//!
//! - `categories`, `products` - the menu
//! - `delivery_zones` - distance tiers and fees
//! - `orders`, `order_items` - status changes and detail views
//! - `notifications` - staff alerts
//!
//! Settings go through `forno_settings`.
//!
//! # Migrations
//!
//! Migrations live in the workspace `migrations/` directory and run via:
//! ```bash
//! cargo run -p forno-cli -- migrate
//! ```

pub mod categories;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod zones;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use categories::{CategoryRepository, NewCategory};
pub use notifications::NotificationRepository;
pub use orders::{OrderDetail, OrderFilter, OrderRepository};
pub use products::{NewProduct, ProductPatch, ProductRepository};
pub use zones::{ZoneInput, ZoneRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate slug, unknown category).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Classify a write error, turning constraint violations into
    /// [`RepositoryError::Conflict`] with `message`.
    pub(crate) fn from_write(err: sqlx::Error, message: &str) -> Self {
        match err.as_database_error() {
            Some(db)
                if db.is_unique_violation()
                    || db.is_foreign_key_violation()
                    || db.is_check_violation() =>
            {
                Self::Conflict(message.to_string())
            }
            _ => Self::Database(err),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
