//! Delivery zone selection and fee rules.
//!
//! A deployment has one origin (the kitchen), a global maximum delivery
//! distance, an optional free-delivery threshold and a set of zones. Each zone
//! is a tier: "up to N km costs F and takes T". For a given distance the
//! tightest active tier that still covers it wins.
//!
//! Everything here is pure. The storefront geocodes the address, measures
//! the distance from [`DeliveryConfig::origin`] and then calls [`evaluate`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::geo::{Coordinates, haversine_km};
use crate::types::ZoneId;
use crate::types::price::round_cents;

/// A delivery tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct DeliveryZone {
    pub id: ZoneId,
    pub name: String,
    /// Upper distance bound (inclusive) in kilometers.
    pub max_distance_km: f64,
    /// Flat fee charged for this tier.
    pub fee: Decimal,
    /// Human-readable ETA, e.g. `"30-40 min"`.
    pub estimated_time: String,
    pub is_active: bool,
}

/// Global delivery settings, stored under [`crate::keys::DELIVERY_CONFIG`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Where distances are measured from.
    pub origin: Coordinates,
    /// Addresses further than this are never served, whatever the zones say.
    pub max_distance_km: f64,
    /// Orders at or above this amount ship for free. `None` disables the rule.
    #[serde(default)]
    pub free_delivery_threshold: Option<Decimal>,
}

/// Validation failures for admin-supplied delivery settings.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DeliveryConfigError {
    #[error("distance must be a positive number of kilometers (got {0})")]
    Distance(f64),
    #[error("amount must not be negative (got {0})")]
    NegativeAmount(Decimal),
    #[error("zone name cannot be empty")]
    EmptyName,
}

impl DeliveryConfig {
    /// Check that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error for a non-positive maximum distance or a negative
    /// threshold.
    pub fn validate(&self) -> Result<(), DeliveryConfigError> {
        validate_distance(self.max_distance_km)?;
        if let Some(threshold) = self.free_delivery_threshold
            && threshold.is_sign_negative()
        {
            return Err(DeliveryConfigError::NegativeAmount(threshold));
        }
        Ok(())
    }
}

impl DeliveryZone {
    /// Check that the zone is usable.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty name, non-positive bound or negative fee.
    pub fn validate(&self) -> Result<(), DeliveryConfigError> {
        if self.name.trim().is_empty() {
            return Err(DeliveryConfigError::EmptyName);
        }
        validate_distance(self.max_distance_km)?;
        if self.fee.is_sign_negative() {
            return Err(DeliveryConfigError::NegativeAmount(self.fee));
        }
        Ok(())
    }

    /// Whether this zone is active and its bound covers `distance_km`.
    #[must_use]
    pub fn covers(&self, distance_km: f64) -> bool {
        self.is_active && distance_km <= self.max_distance_km
    }
}

fn validate_distance(km: f64) -> Result<(), DeliveryConfigError> {
    if km.is_finite() && km > 0.0 {
        Ok(())
    } else {
        Err(DeliveryConfigError::Distance(km))
    }
}

/// Select the tightest active zone whose bound covers `distance_km`.
///
/// Zones with equal bounds are broken by the lowest ID so the answer does not
/// depend on the order the zones were loaded in.
#[must_use]
pub fn select_zone(zones: &[DeliveryZone], distance_km: f64) -> Option<&DeliveryZone> {
    zones
        .iter()
        .filter(|zone| zone.covers(distance_km))
        .min_by(|a, b| {
            a.max_distance_km
                .total_cmp(&b.max_distance_km)
                .then_with(|| a.id.cmp(&b.id))
        })
}

/// Fee for an order of `order_amount` delivered within a zone charging
/// `zone_fee`.
#[must_use]
pub fn delivery_fee(zone_fee: Decimal, order_amount: Decimal, threshold: Option<Decimal>) -> Decimal {
    match threshold {
        Some(threshold) if order_amount >= threshold => Decimal::ZERO,
        _ => round_cents(zone_fee),
    }
}

/// Outcome of checking a distance against the delivery configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneDecision<'a> {
    /// Beyond [`DeliveryConfig::max_distance_km`].
    OutOfRange { max_distance_km: f64 },
    /// Within range but no active zone covers the distance.
    NoZone,
    /// Served by `zone` at `fee`.
    InZone { zone: &'a DeliveryZone, fee: Decimal },
}

/// Decide whether a distance can be served and at what fee.
#[must_use]
pub fn evaluate<'a>(
    config: &DeliveryConfig,
    zones: &'a [DeliveryZone],
    distance_km: f64,
    order_amount: Decimal,
) -> ZoneDecision<'a> {
    if distance_km > config.max_distance_km {
        return ZoneDecision::OutOfRange {
            max_distance_km: config.max_distance_km,
        };
    }

    select_zone(zones, distance_km).map_or(ZoneDecision::NoZone, |zone| ZoneDecision::InZone {
        zone,
        fee: delivery_fee(zone.fee, order_amount, config.free_delivery_threshold),
    })
}

/// A geocoded address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedAddress {
    /// The address as normalized by the geocoder.
    pub formatted_address: String,
    pub coordinates: Coordinates,
}

/// Why an address cannot be delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryRejection {
    /// The geocoder could not resolve the address.
    InvalidAddress,
    /// Further than the global maximum distance.
    OutOfRange,
    /// In range but no active zone covers it.
    NoZone,
    /// Geocoding or configuration failure; the address may well be fine.
    Unavailable,
}

impl DeliveryRejection {
    /// Customer-facing message.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidAddress => "Address could not be found",
            Self::OutOfRange => "Address is outside our delivery range",
            Self::NoZone => "No delivery zone is configured for this distance",
            Self::Unavailable => "Delivery check is currently unavailable",
        }
    }
}

/// Result of validating an address for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryValidation {
    /// The address was resolved and measured.
    pub is_valid: bool,
    /// A zone covers the address; the order can be delivered.
    pub is_within_zone: bool,
    /// Distance from the origin, rounded to 10 m.
    pub distance_km: Option<f64>,
    pub fee: Option<Decimal>,
    pub free_delivery: bool,
    pub estimated_time: Option<String>,
    pub zone_id: Option<ZoneId>,
    pub zone_name: Option<String>,
    pub formatted_address: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub rejection: Option<DeliveryRejection>,
    pub error: Option<String>,
}

impl DeliveryValidation {
    fn rejected(rejection: DeliveryRejection, error: String) -> Self {
        Self {
            is_valid: false,
            is_within_zone: false,
            distance_km: None,
            fee: None,
            free_delivery: false,
            estimated_time: None,
            zone_id: None,
            zone_name: None,
            formatted_address: None,
            coordinates: None,
            rejection: Some(rejection),
            error: Some(error),
        }
    }

    /// The geocoder found nothing for the address.
    #[must_use]
    pub fn invalid_address() -> Self {
        Self::rejected(
            DeliveryRejection::InvalidAddress,
            DeliveryRejection::InvalidAddress.message().to_owned(),
        )
    }

    /// Geocoding, configuration or database failure.
    #[must_use]
    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::rejected(DeliveryRejection::Unavailable, detail.into())
    }

    /// Build the result for a resolved address.
    #[must_use]
    pub fn resolved(
        address: GeocodedAddress,
        distance_km: f64,
        decision: &ZoneDecision<'_>,
    ) -> Self {
        let mut result = Self {
            is_valid: true,
            is_within_zone: false,
            distance_km: Some((distance_km * 100.0).round() / 100.0),
            fee: None,
            free_delivery: false,
            estimated_time: None,
            zone_id: None,
            zone_name: None,
            formatted_address: Some(address.formatted_address),
            coordinates: Some(address.coordinates),
            rejection: None,
            error: None,
        };

        match decision {
            ZoneDecision::InZone { zone, fee } => {
                result.is_within_zone = true;
                result.fee = Some(*fee);
                result.free_delivery = fee.is_zero();
                result.estimated_time = Some(zone.estimated_time.clone());
                result.zone_id = Some(zone.id);
                result.zone_name = Some(zone.name.clone());
            }
            ZoneDecision::OutOfRange { max_distance_km } => {
                result.rejection = Some(DeliveryRejection::OutOfRange);
                result.error = Some(format!(
                    "{} (maximum {max_distance_km} km)",
                    DeliveryRejection::OutOfRange.message()
                ));
            }
            ZoneDecision::NoZone => {
                result.rejection = Some(DeliveryRejection::NoZone);
                result.error = Some(DeliveryRejection::NoZone.message().to_owned());
            }
        }

        result
    }
}

/// Measure `address` from the configured origin and evaluate it.
#[must_use]
pub fn validate_address(
    config: &DeliveryConfig,
    zones: &[DeliveryZone],
    address: GeocodedAddress,
    order_amount: Decimal,
) -> DeliveryValidation {
    let distance_km = haversine_km(config.origin, address.coordinates);
    let decision = evaluate(config, zones, distance_km, order_amount);
    DeliveryValidation::resolved(address, distance_km, &decision)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn zone(id: i32, max_km: f64, fee: &str) -> DeliveryZone {
        DeliveryZone {
            id: ZoneId::new(id),
            name: format!("Zone {id}"),
            max_distance_km: max_km,
            fee: dec(fee),
            estimated_time: format!("{}-{} min", 20 + id * 10, 30 + id * 10),
            is_active: true,
        }
    }

    fn config(max_km: f64, threshold: Option<&str>) -> DeliveryConfig {
        DeliveryConfig {
            origin: Coordinates::new(45.4642, 9.19).unwrap(),
            max_distance_km: max_km,
            free_delivery_threshold: threshold.map(dec),
        }
    }

    fn tiers() -> Vec<DeliveryZone> {
        // Deliberately unsorted.
        vec![zone(3, 10.0, "5.00"), zone(1, 3.0, "1.50"), zone(2, 6.0, "3.00")]
    }

    #[test]
    fn test_select_tightest_zone() {
        let zones = tiers();
        assert_eq!(select_zone(&zones, 0.0).unwrap().id, ZoneId::new(1));
        assert_eq!(select_zone(&zones, 2.99).unwrap().id, ZoneId::new(1));
        assert_eq!(select_zone(&zones, 4.2).unwrap().id, ZoneId::new(2));
        assert_eq!(select_zone(&zones, 9.0).unwrap().id, ZoneId::new(3));
        assert!(select_zone(&zones, 10.01).is_none());
    }

    #[test]
    fn test_zone_bound_is_inclusive() {
        let zones = tiers();
        assert_eq!(select_zone(&zones, 3.0).unwrap().id, ZoneId::new(1));
        assert_eq!(select_zone(&zones, 6.0).unwrap().id, ZoneId::new(2));
    }

    #[test]
    fn test_inactive_zones_are_skipped() {
        let mut zones = tiers();
        zones[1].is_active = false; // the 3 km tier
        assert_eq!(select_zone(&zones, 1.0).unwrap().id, ZoneId::new(2));
    }

    #[test]
    fn test_equal_bounds_pick_lowest_id() {
        let zones = vec![zone(9, 5.0, "4.00"), zone(4, 5.0, "2.00")];
        assert_eq!(select_zone(&zones, 1.0).unwrap().id, ZoneId::new(4));
    }

    #[test]
    fn test_selected_zone_is_tightest_covering_bound() {
        let zones = tiers();
        let mut d = 0.0;
        while d <= 12.0 {
            let covering: Vec<_> = zones.iter().filter(|z| z.covers(d)).collect();
            match select_zone(&zones, d) {
                Some(selected) => {
                    assert!(selected.max_distance_km >= d);
                    assert!(covering
                        .iter()
                        .all(|z| z.max_distance_km >= selected.max_distance_km));
                }
                None => assert!(covering.is_empty()),
            }
            d += 0.25;
        }
    }

    #[test]
    fn test_fee_waived_at_threshold() {
        let threshold = Some(dec("30.00"));
        assert_eq!(delivery_fee(dec("3.00"), dec("29.99"), threshold), dec("3.00"));
        assert_eq!(delivery_fee(dec("3.00"), dec("30.00"), threshold), Decimal::ZERO);
        assert_eq!(delivery_fee(dec("3.00"), dec("120"), threshold), Decimal::ZERO);
        assert_eq!(delivery_fee(dec("3.00"), dec("500"), None), dec("3.00"));
    }

    #[test]
    fn test_fee_zero_above_threshold_for_every_distance() {
        let zones = tiers();
        let cfg = config(10.0, Some("25"));
        let mut d = 0.0;
        while d <= 10.0 {
            if let ZoneDecision::InZone { fee, .. } = evaluate(&cfg, &zones, d, dec("25")) {
                assert_eq!(fee, Decimal::ZERO);
            }
            d += 0.5;
        }
    }

    #[test]
    fn test_evaluate_out_of_range_before_zones() {
        // A zone reaching further than the global maximum never applies.
        let zones = vec![zone(1, 50.0, "9.00")];
        let cfg = config(8.0, None);
        assert_eq!(
            evaluate(&cfg, &zones, 8.5, dec("10")),
            ZoneDecision::OutOfRange {
                max_distance_km: 8.0
            }
        );
    }

    #[test]
    fn test_evaluate_no_zone() {
        let zones = vec![zone(1, 2.0, "1.00")];
        let cfg = config(8.0, None);
        assert_eq!(evaluate(&cfg, &zones, 5.0, dec("10")), ZoneDecision::NoZone);
        assert_eq!(evaluate(&cfg, &[], 1.0, dec("10")), ZoneDecision::NoZone);
    }

    #[test]
    fn test_validate_address_in_zone() {
        let cfg = config(10.0, Some("40"));
        let zones = tiers();
        // ~2.2 km north of the origin.
        let address = GeocodedAddress {
            formatted_address: "Via Example 1, Milano".to_owned(),
            coordinates: Coordinates::new(45.4842, 9.19).unwrap(),
        };

        let result = validate_address(&cfg, &zones, address, dec("18.50"));
        assert!(result.is_valid);
        assert!(result.is_within_zone);
        assert_eq!(result.zone_id, Some(ZoneId::new(1)));
        assert_eq!(result.fee, Some(dec("1.50")));
        assert!(!result.free_delivery);
        assert_eq!(result.distance_km, Some(2.22));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_validate_address_out_of_range() {
        let cfg = config(10.0, None);
        let address = GeocodedAddress {
            formatted_address: "Roma".to_owned(),
            coordinates: Coordinates::new(41.9028, 12.4964).unwrap(),
        };

        let result = validate_address(&cfg, &tiers(), address, dec("18.50"));
        assert!(result.is_valid);
        assert!(!result.is_within_zone);
        assert_eq!(result.rejection, Some(DeliveryRejection::OutOfRange));
        assert!(result.fee.is_none());
        assert!(result.error.is_some());
    }

    #[test]
    fn test_invalid_address_result() {
        let result = DeliveryValidation::invalid_address();
        assert!(!result.is_valid);
        assert!(!result.is_within_zone);
        assert_eq!(result.rejection, Some(DeliveryRejection::InvalidAddress));
    }

    #[test]
    fn test_config_validation() {
        assert!(config(5.0, Some("0")).validate().is_ok());
        assert!(config(0.0, None).validate().is_err());
        assert!(config(f64::INFINITY, None).validate().is_err());
        assert_eq!(
            config(5.0, Some("-1")).validate(),
            Err(DeliveryConfigError::NegativeAmount(dec("-1")))
        );

        let mut bad = zone(1, 2.0, "-0.50");
        assert!(bad.validate().is_err());
        bad.fee = dec("0.50");
        bad.name = "  ".to_owned();
        assert_eq!(bad.validate(), Err(DeliveryConfigError::EmptyName));
    }

    #[test]
    fn test_validation_serializes_for_clients() {
        let json = serde_json::to_value(DeliveryValidation::invalid_address()).unwrap();
        assert_eq!(json["is_valid"], false);
        assert_eq!(json["rejection"], "invalid_address");
    }
}
