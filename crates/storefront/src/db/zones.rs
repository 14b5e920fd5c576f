//! Delivery zone queries.

use async_trait::async_trait;
use forno_core::DeliveryZone;
use sqlx::PgPool;
use tracing::instrument;

use super::RepositoryError;
use crate::services::delivery::ZoneSource;

/// [`ZoneSource`] backed by `forno.delivery_zones`.
#[derive(Clone)]
pub struct PgZoneSource {
    pool: PgPool,
}

impl PgZoneSource {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ZoneSource for PgZoneSource {
    #[instrument(skip(self))]
    async fn active_zones(&self) -> Result<Vec<DeliveryZone>, RepositoryError> {
        let zones = sqlx::query_as::<_, DeliveryZone>(
            r"
            SELECT id, name, max_distance_km, fee, estimated_time, is_active
            FROM forno.delivery_zones
            WHERE is_active
            ORDER BY max_distance_km, id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(zones)
    }
}
