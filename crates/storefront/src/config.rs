//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BRAND` - `pizzeria` or `kebab` (default: pizzeria)
//! - `STOREFRONT_CURRENCY` - ISO 4217 code for menu prices (default: EUR)
//! - `GEOCODING_BASE_URL` - Geocoding endpoint (default: Google Geocoding JSON API)
//! - `SETTINGS_POLL_INTERVAL_SECS` - Settings polling fallback interval (default: 30)
//! - `SEARCH_REINDEX_INTERVAL_SECS` - Search index rebuild interval (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//!
//! The geocoding API key is not configured here; it is read from the
//! `geocoding.api_key` setting so staff can rotate it without a redeploy.

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use forno_core::{Brand, CurrencyCode};
use secrecy::SecretString;
use thiserror::Error;

/// Google Geocoding JSON endpoint.
pub const DEFAULT_GEOCODING_BASE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Which restaurant variant this deployment serves
    pub brand: Brand,
    /// Currency menu prices are quoted in
    pub currency: CurrencyCode,
    /// Geocoding endpoint
    pub geocoding_base_url: String,
    /// How often the settings poller checks for missed changes
    pub settings_poll_interval: Duration,
    /// How often the search index is rebuilt from the database
    pub search_reindex_interval: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production", "staging")
    pub sentry_environment: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            database_url: get_database_url("STOREFRONT_DATABASE_URL")?,
            host: parse_env("STOREFRONT_HOST", "127.0.0.1")?,
            port: parse_env("STOREFRONT_PORT", "3000")?,
            brand: parse_env("STOREFRONT_BRAND", "pizzeria")?,
            currency: parse_env("STOREFRONT_CURRENCY", "EUR")?,
            geocoding_base_url: get_env_or_default("GEOCODING_BASE_URL", DEFAULT_GEOCODING_BASE_URL),
            settings_poll_interval: parse_secs("SETTINGS_POLL_INTERVAL_SECS", "30")?,
            search_reindex_interval: parse_secs("SEARCH_REINDEX_INTERVAL_SECS", "300")?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a whole number of seconds. Zero is rejected.
fn parse_secs(key: &str, default: &str) -> Result<Duration, ConfigError> {
    secs_from(key, &get_env_or_default(key, default))
}

fn secs_from(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    match parse_value::<u64>(key, raw)? {
        0 => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        )),
        secs => Ok(Duration::from_secs(secs)),
    }
}
