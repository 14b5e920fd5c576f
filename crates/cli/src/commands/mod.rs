//! Subcommand implementations.

pub mod delivery;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;

/// Read the database URL, preferring `var` and falling back to `DATABASE_URL`.
pub(crate) fn database_url(var: &'static str) -> Result<SecretString, MissingEnvVar> {
    dotenvy::dotenv().ok();
    std::env::var(var)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MissingEnvVar(var))
}

/// A required environment variable is not set.
#[derive(Debug, thiserror::Error)]
#[error("Missing environment variable: {0} (or DATABASE_URL)")]
pub struct MissingEnvVar(pub &'static str);
