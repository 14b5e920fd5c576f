//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /api/site                 - Brand and branding settings
//!
//! # Menu
//! GET  /api/menu                 - Categories with available products
//! GET  /api/products/{id}        - Product detail
//! GET  /api/search               - Full-text product search
//!
//! # Content
//! GET  /api/content/events       - SSE stream of public setting changes
//! GET  /api/content/{key}        - Public content setting
//!
//! # Delivery
//! GET  /api/delivery/zones       - Active zones and delivery rules
//! POST /api/delivery/validate    - Check an address (rate limited)
//!
//! # Orders
//! POST /api/orders               - Place an order (rate limited)
//! ```
//!
//! `/health` and `/health/ready` are mounted by the binary.

pub mod content;
pub mod delivery;
pub mod menu;
pub mod orders;
pub mod search;
pub mod site;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{delivery_rate_limiter, order_rate_limiter};
use crate::state::AppState;

/// Create the content routes router.
pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(content::events))
        .route("/{key}", get(content::show))
}

/// Create the delivery routes router.
pub fn delivery_routes() -> Router<AppState> {
    Router::new()
        .route("/validate", post(delivery::validate))
        .route_layer(delivery_rate_limiter())
        .route("/zones", get(delivery::zones))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/api/orders", post(orders::place))
        .route_layer(order_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/site", get(site::show))
        // Menu
        .route("/api/menu", get(menu::index))
        .route("/api/products/{id}", get(menu::show))
        .route("/api/search", get(search::search))
        // Content
        .nest("/api/content", content_routes())
        // Delivery
        .nest("/api/delivery", delivery_routes())
        // Orders
        .merge(order_routes())
}
