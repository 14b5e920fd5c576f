//! Forno Core - Shared domain types and delivery-zone logic.
//!
//! This crate provides the types used across all Forno components:
//! - `storefront` - Public menu, search, delivery checks and ordering
//! - `admin` - Staff back office (private network only)
//! - `cli` - Migrations, seeding and delivery diagnostics
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Geocoding and persistence live in the binaries; the
//! arithmetic that decides whether an address can be served lives here.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, statuses, brands and phone numbers
//! - [`geo`] - Coordinates and great-circle distance
//! - [`delivery`] - Zone selection, fee rules and the validation result
//! - [`keys`] - Well-known settings keys and their visibility
//! - [`models`] - Catalog, order and notification records
//! - [`order`] - Server-side order pricing and stock checks

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod delivery;
pub mod geo;
pub mod keys;
pub mod models;
pub mod order;
pub mod types;

pub use delivery::{DeliveryConfig, DeliveryValidation, DeliveryZone, ZoneDecision};
pub use geo::{Coordinates, GeoError};
pub use models::{Category, Notification, Order, OrderItem, Product};
pub use order::{LineRequest, OrderError, PricedLine, PricedOrder, price_order};
pub use types::*;
