//! Database access for the storefront.
//!
//! # Schema: `forno`
//!
//! The storefront reads the catalog and delivery zones and writes new orders:
//!
//! - `categories`, `products` - the menu
//! - `delivery_zones` - distance tiers and fees
//! - `orders`, `order_items` - placed orders
//! - `notifications` - staff alerts raised when an order arrives
//!
//! Settings are accessed through `forno_settings`, not from here.
//!
//! # Migrations
//!
//! Migrations live in the workspace `migrations/` directory and run via:
//! ```bash
//! cargo run -p forno-cli -- migrate
//! ```

pub mod catalog;
pub mod orders;
pub mod zones;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use catalog::CatalogRepository;
pub use orders::{NewOrder, OrderRepository};
pub use zones::PgZoneSource;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// A quantity that does not fit the `INTEGER` column.
    #[error("quantity {0} is out of range")]
    QuantityOutOfRange(u32),
}

/// Convert an order quantity for binding to an `INTEGER` column.
pub(crate) fn quantity_param(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity).map_err(|_| RepositoryError::QuantityOutOfRange(quantity))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_param_range() {
        assert_eq!(quantity_param(99).ok(), Some(99));
        assert!(matches!(
            quantity_param(u32::MAX),
            Err(RepositoryError::QuantityOutOfRange(u32::MAX))
        ));
    }
}
