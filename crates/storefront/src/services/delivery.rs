//! The delivery zone resolver.
//!
//! Turns "can you deliver to this address, for this order amount?" into a
//! [`DeliveryValidation`]. The resolver never fails: missing configuration,
//! geocoder trouble and database errors all come back as a validation with
//! `is_valid = false` and an error message, and are logged here.

use std::sync::Arc;

use async_trait::async_trait;
use forno_core::delivery::validate_address;
use forno_core::{DeliveryConfig, DeliveryValidation, DeliveryZone, keys};
use forno_settings::SettingsStore;
use rust_decimal::Decimal;
use tracing::{error, info, instrument, warn};

use super::geocoding::Geocoder;
use crate::db::RepositoryError;

/// Where active delivery zones come from.
#[async_trait]
pub trait ZoneSource: Send + Sync {
    /// All active zones.
    async fn active_zones(&self) -> Result<Vec<DeliveryZone>, RepositoryError>;
}

#[async_trait]
impl ZoneSource for Vec<DeliveryZone> {
    async fn active_zones(&self) -> Result<Vec<DeliveryZone>, RepositoryError> {
        Ok(self.iter().filter(|z| z.is_active).cloned().collect())
    }
}

/// Geocodes addresses and matches them against delivery zones.
#[derive(Clone)]
pub struct DeliveryZoneResolver {
    settings: SettingsStore,
    geocoder: Arc<dyn Geocoder>,
    zones: Arc<dyn ZoneSource>,
}

impl DeliveryZoneResolver {
    #[must_use]
    pub fn new(
        settings: SettingsStore,
        geocoder: Arc<dyn Geocoder>,
        zones: Arc<dyn ZoneSource>,
    ) -> Self {
        Self {
            settings,
            geocoder,
            zones,
        }
    }

    /// Current delivery configuration, if set and well-formed.
    pub async fn config(&self) -> Option<DeliveryConfig> {
        match self.settings.get_typed::<DeliveryConfig>(keys::DELIVERY_CONFIG).await {
            Ok(config) => config.filter(|c| {
                c.validate()
                    .inspect_err(|e| error!(error = %e, "delivery.config is invalid"))
                    .is_ok()
            }),
            Err(e) => {
                error!(error = %e, "failed to load delivery config");
                None
            }
        }
    }

    /// Active zones, or an empty list if they cannot be loaded.
    pub async fn zones(&self) -> Vec<DeliveryZone> {
        self.zones.active_zones().await.unwrap_or_else(|e| {
            error!(error = %e, "failed to load delivery zones");
            Vec::new()
        })
    }

    /// Validate `address` for an order of `order_amount`.
    #[instrument(skip(self))]
    pub async fn resolve(&self, address: &str, order_amount: Decimal) -> DeliveryValidation {
        let address = address.trim();
        if address.is_empty() {
            return DeliveryValidation::invalid_address();
        }

        let config = match self.settings.get_typed::<DeliveryConfig>(keys::DELIVERY_CONFIG).await {
            Ok(Some(config)) => config,
            Ok(None) => {
                warn!("delivery requested but delivery.config is not set");
                return DeliveryValidation::unavailable("Delivery is not configured");
            }
            Err(e) => {
                error!(error = %e, "failed to load delivery config");
                return DeliveryValidation::unavailable("Delivery is not configured");
            }
        };
        if let Err(e) = config.validate() {
            error!(error = %e, "delivery.config is invalid");
            return DeliveryValidation::unavailable("Delivery is not configured");
        }

        let geocoded = match self.geocoder.geocode(address).await {
            Ok(Some(geocoded)) => geocoded,
            Ok(None) => {
                info!("address could not be geocoded");
                return DeliveryValidation::invalid_address();
            }
            Err(e) => {
                warn!(error = %e, "geocoding failed");
                return DeliveryValidation::unavailable(
                    "Could not verify the address, please try again later",
                );
            }
        };

        let zones = match self.zones.active_zones().await {
            Ok(zones) => zones,
            Err(e) => {
                error!(error = %e, "failed to load delivery zones");
                return DeliveryValidation::unavailable("Delivery check is currently unavailable");
            }
        };

        let validation = validate_address(&config, &zones, geocoded, order_amount);
        info!(
            distance_km = validation.distance_km,
            within_zone = validation.is_within_zone,
            zone = validation.zone_name.as_deref(),
            "delivery address resolved"
        );
        validation
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use forno_core::delivery::{DeliveryRejection, GeocodedAddress};
    use forno_core::{Coordinates, ZoneId};
    use forno_settings::MemoryBackend;
    use serde_json::json;

    use super::*;
    use crate::services::geocoding::GeocodingError;

    /// Geocoder returning a fixed answer and counting calls.
    pub(crate) struct StubGeocoder {
        pub answer: Option<(f64, f64)>,
        pub fail: bool,
        pub calls: Mutex<usize>,
    }

    impl StubGeocoder {
        pub(crate) fn at(lat: f64, lng: f64) -> Self {
            Self {
                answer: Some((lat, lng)),
                fail: false,
                calls: Mutex::new(0),
            }
        }

        pub(crate) fn nothing() -> Self {
            Self {
                answer: None,
                fail: false,
                calls: Mutex::new(0),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                answer: None,
                fail: true,
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl Geocoder for StubGeocoder {
        async fn geocode(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodingError> {
            *self.calls.lock().unwrap() += 1;
            if self.fail {
                return Err(GeocodingError::MissingApiKey);
            }
            Ok(self.answer.map(|(lat, lng)| GeocodedAddress {
                formatted_address: format!("{address} (normalized)"),
                coordinates: Coordinates::new(lat, lng).unwrap(),
            }))
        }
    }

    pub(crate) fn zone(id: i32, max_km: f64, fee_cents: i64) -> DeliveryZone {
        DeliveryZone {
            id: ZoneId::new(id),
            name: format!("Zone {id}"),
            max_distance_km: max_km,
            fee: Decimal::new(fee_cents, 2),
            estimated_time: "30-45 min".into(),
            is_active: true,
        }
    }

    /// Settings with the kitchen at (45.0, 9.0), 10 km range, free over 30.00.
    pub(crate) async fn configured_settings() -> SettingsStore {
        let settings = SettingsStore::new(Arc::new(MemoryBackend::new()));
        settings
            .set(
                keys::DELIVERY_CONFIG,
                json!({
                    "origin": { "lat": 45.0, "lng": 9.0 },
                    "max_distance_km": 10.0,
                    "free_delivery_threshold": "30.00"
                }),
            )
            .await
            .unwrap();
        settings
    }

    fn resolver(settings: SettingsStore, geocoder: StubGeocoder) -> DeliveryZoneResolver {
        let zones = vec![zone(1, 3.0, 150), zone(2, 7.0, 300)];
        DeliveryZoneResolver::new(settings, Arc::new(geocoder), Arc::new(zones))
    }

    #[tokio::test]
    async fn test_resolves_tightest_zone() {
        // 0.02 degrees of latitude is about 2.2 km.
        let resolver = resolver(configured_settings().await, StubGeocoder::at(45.02, 9.0));
        let v = resolver.resolve("Via Roma 1", Decimal::new(1500, 2)).await;

        assert!(v.is_valid);
        assert!(v.is_within_zone);
        assert_eq!(v.zone_id, Some(ZoneId::new(1)));
        assert_eq!(v.fee, Some(Decimal::new(150, 2)));
        assert_eq!(v.formatted_address.as_deref(), Some("Via Roma 1 (normalized)"));
    }

    #[tokio::test]
    async fn test_free_delivery_over_threshold() {
        let resolver = resolver(configured_settings().await, StubGeocoder::at(45.05, 9.0));
        let v = resolver.resolve("Via Roma 1", Decimal::new(3000, 2)).await;

        assert!(v.is_within_zone);
        assert_eq!(v.zone_id, Some(ZoneId::new(2)));
        assert_eq!(v.fee, Some(Decimal::ZERO));
        assert!(v.free_delivery);
    }

    #[tokio::test]
    async fn test_out_of_range() {
        // About 22 km away.
        let resolver = resolver(configured_settings().await, StubGeocoder::at(45.2, 9.0));
        let v = resolver.resolve("Far away", Decimal::ZERO).await;

        assert!(v.is_valid);
        assert!(!v.is_within_zone);
        assert_eq!(v.rejection, Some(DeliveryRejection::OutOfRange));
    }

    #[tokio::test]
    async fn test_no_zone_between_last_tier_and_max() {
        // About 8.9 km: within range but past the 7 km tier.
        let resolver = resolver(configured_settings().await, StubGeocoder::at(45.08, 9.0));
        let v = resolver.resolve("Edge", Decimal::ZERO).await;

        assert!(v.is_valid);
        assert!(!v.is_within_zone);
        assert_eq!(v.rejection, Some(DeliveryRejection::NoZone));
    }

    #[tokio::test]
    async fn test_unknown_address() {
        let resolver = resolver(configured_settings().await, StubGeocoder::nothing());
        let v = resolver.resolve("zzzz", Decimal::ZERO).await;

        assert!(!v.is_valid);
        assert!(!v.is_within_zone);
        assert_eq!(v.rejection, Some(DeliveryRejection::InvalidAddress));
    }

    #[tokio::test]
    async fn test_geocoder_failure_is_reported_not_raised() {
        let resolver = resolver(configured_settings().await, StubGeocoder::failing());
        let v = resolver.resolve("Via Roma 1", Decimal::ZERO).await;

        assert!(!v.is_valid);
        assert_eq!(v.rejection, Some(DeliveryRejection::Unavailable));
        assert!(v.error.is_some());
    }

    #[tokio::test]
    async fn test_missing_config_skips_geocoding() {
        let settings = SettingsStore::new(Arc::new(MemoryBackend::new()));
        let geocoder = Arc::new(StubGeocoder::at(45.0, 9.0));
        let resolver =
            DeliveryZoneResolver::new(settings, geocoder.clone(), Arc::new(vec![zone(1, 3.0, 100)]));

        let v = resolver.resolve("Via Roma 1", Decimal::ZERO).await;
        assert!(!v.is_valid);
        assert_eq!(*geocoder.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_config_is_unavailable() {
        for config in [
            json!({
                "origin": { "lat": 45.0, "lng": 9.0 },
                "max_distance_km": 10.0,
                "free_delivery_threshold": "-5"
            }),
            json!({ "origin": { "lat": 450.0, "lng": 9.0 }, "max_distance_km": 10.0 }),
            json!({ "origin": { "lat": 45.0, "lng": 9.0 }, "max_distance_km": -1.0 }),
        ] {
            let settings = SettingsStore::new(Arc::new(MemoryBackend::new()));
            settings.set(keys::DELIVERY_CONFIG, config.clone()).await.unwrap();
            let geocoder = Arc::new(StubGeocoder::at(45.0, 9.0));
            let resolver = DeliveryZoneResolver::new(
                settings,
                geocoder.clone(),
                Arc::new(vec![zone(1, 3.0, 100)]),
            );

            let v = resolver.resolve("Via Roma 1", Decimal::ZERO).await;
            assert!(!v.is_valid, "{config}");
            assert!(!v.is_within_zone, "{config}");
            assert_eq!(v.rejection, Some(DeliveryRejection::Unavailable), "{config}");
            assert_eq!(*geocoder.calls.lock().unwrap(), 0, "{config}");
            assert!(resolver.config().await.is_none(), "{config}");
        }
    }

    #[tokio::test]
    async fn test_blank_address_is_invalid() {
        let geocoder = Arc::new(StubGeocoder::at(45.0, 9.0));
        let resolver = DeliveryZoneResolver::new(
            configured_settings().await,
            geocoder.clone(),
            Arc::new(Vec::<DeliveryZone>::new()),
        );

        let v = resolver.resolve("   ", Decimal::ZERO).await;
        assert_eq!(v.rejection, Some(DeliveryRejection::InvalidAddress));
        assert_eq!(*geocoder.calls.lock().unwrap(), 0);
    }
}
