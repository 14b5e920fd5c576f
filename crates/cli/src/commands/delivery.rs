//! Delivery diagnostics.
//!
//! Runs the same resolver the storefront uses against the live settings and
//! zones, and prints the resulting validation as JSON.
//!
//! ```bash
//! forno delivery check "Via Torino 12, Milano" --amount 24.50
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `GEOCODING_BASE_URL` - Override the geocoding endpoint

use std::sync::Arc;

use forno_core::DeliveryValidation;
use forno_settings::{PgSettingsBackend, SettingsStore};
use forno_storefront::config::DEFAULT_GEOCODING_BASE_URL;
use forno_storefront::db::{self, PgZoneSource};
use forno_storefront::services::{DeliveryZoneResolver, GoogleGeocoder};
use rust_decimal::Decimal;
use tracing::info;

use super::database_url;

/// Resolve `address` for an order of `amount`.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the amount is negative.
/// Geocoding problems are part of the returned validation, not errors.
pub async fn check(address: &str, amount: Decimal) -> Result<DeliveryValidation, Box<dyn std::error::Error>> {
    if amount.is_sign_negative() {
        return Err("amount must not be negative".into());
    }

    let database_url = database_url("STOREFRONT_DATABASE_URL")?;
    let base_url = std::env::var("GEOCODING_BASE_URL")
        .unwrap_or_else(|_| DEFAULT_GEOCODING_BASE_URL.to_string());

    let pool = db::create_pool(&database_url).await?;
    let settings = SettingsStore::new(Arc::new(PgSettingsBackend::new(pool.clone())));
    let geocoder = GoogleGeocoder::new(base_url, settings.clone())?;
    let resolver = DeliveryZoneResolver::new(
        settings,
        Arc::new(geocoder),
        Arc::new(PgZoneSource::new(pool)),
    );

    let validation = resolver.resolve(address, amount).await;
    info!(
        valid = validation.is_valid,
        within_zone = validation.is_within_zone,
        "Delivery check finished"
    );
    Ok(validation)
}
