//! Delivery zone writes.

use forno_core::delivery::DeliveryConfigError;
use forno_core::{DeliveryZone, ZoneId};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use super::RepositoryError;

const ZONE_COLUMNS: &str = "id, name, max_distance_km, fee, estimated_time, is_active";

/// Zone fields accepted on create and replace.
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneInput {
    pub name: String,
    pub max_distance_km: f64,
    pub fee: Decimal,
    #[serde(default)]
    pub estimated_time: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

impl ZoneInput {
    /// Validate using the same rules the resolver relies on.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty name, non-positive bound or negative fee.
    pub fn validate(&self) -> Result<(), DeliveryConfigError> {
        DeliveryZone {
            id: ZoneId::new(0),
            name: self.name.clone(),
            max_distance_km: self.max_distance_km,
            fee: self.fee,
            estimated_time: self.estimated_time.clone(),
            is_active: self.is_active,
        }
        .validate()
    }
}

/// Repository for delivery zone database operations.
pub struct ZoneRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ZoneRepository<'a> {
    /// Create a new zone repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All zones, active or not, tightest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<DeliveryZone>, RepositoryError> {
        let sql = format!(
            "SELECT {ZONE_COLUMNS} FROM forno.delivery_zones ORDER BY max_distance_km, id"
        );
        Ok(sqlx::query_as::<_, DeliveryZone>(&sql)
            .fetch_all(self.pool)
            .await?)
    }

    /// Create a zone.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: &ZoneInput) -> Result<DeliveryZone, RepositoryError> {
        let sql = format!(
            "INSERT INTO forno.delivery_zones \
             (name, max_distance_km, fee, estimated_time, is_active) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {ZONE_COLUMNS}"
        );
        sqlx::query_as::<_, DeliveryZone>(&sql)
            .bind(input.name.trim())
            .bind(input.max_distance_km)
            .bind(input.fee)
            .bind(input.estimated_time.trim())
            .bind(input.is_active)
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "invalid zone"))
    }

    /// Replace a zone's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the zone does not exist.
    #[instrument(skip(self, input), fields(zone_id = %id))]
    pub async fn update(&self, id: ZoneId, input: &ZoneInput) -> Result<DeliveryZone, RepositoryError> {
        let sql = format!(
            "UPDATE forno.delivery_zones SET \
             name = $2, max_distance_km = $3, fee = $4, estimated_time = $5, is_active = $6 \
             WHERE id = $1 RETURNING {ZONE_COLUMNS}"
        );
        sqlx::query_as::<_, DeliveryZone>(&sql)
            .bind(id)
            .bind(input.name.trim())
            .bind(input.max_distance_km)
            .bind(input.fee)
            .bind(input.estimated_time.trim())
            .bind(input.is_active)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "invalid zone"))?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a zone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the zone does not exist.
    #[instrument(skip(self), fields(zone_id = %id))]
    pub async fn delete(&self, id: ZoneId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM forno.delivery_zones WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
