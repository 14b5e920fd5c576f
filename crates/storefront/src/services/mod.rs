//! Business logic for the storefront.
//!
//! - [`geocoding`] - address to coordinates through an external API
//! - [`delivery`] - the delivery zone resolver
//! - [`ordering`] - order placement

pub mod delivery;
pub mod geocoding;
pub mod ordering;

pub use delivery::{DeliveryZoneResolver, ZoneSource};
pub use geocoding::{Geocoder, GeocodingError, GoogleGeocoder};
pub use ordering::{OrderService, PlaceOrderError, PlaceOrderRequest};
