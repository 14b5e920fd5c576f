//! HTTP route handlers for the admin API.
//!
//! # Route Structure
//!
//! ```text
//! # Settings
//! GET    /api/settings                 - List settings (optional ?prefix=)
//! GET    /api/settings/{key}           - Get one setting
//! PUT    /api/settings/{key}           - Create or replace a setting
//! DELETE /api/settings/{key}           - Remove a setting
//!
//! # Delivery
//! GET    /api/delivery/config          - Origin, max distance, free threshold
//! PUT    /api/delivery/config          - Replace the delivery config
//! GET    /api/delivery/zones           - All zones
//! POST   /api/delivery/zones           - Create a zone
//! PUT    /api/delivery/zones/{id}      - Replace a zone
//! DELETE /api/delivery/zones/{id}      - Delete a zone
//!
//! # Catalog
//! GET    /api/categories               - List categories
//! POST   /api/categories               - Create a category
//! DELETE /api/categories/{id}          - Delete a category and its products
//! GET    /api/products                 - List products (optional ?category_id=)
//! POST   /api/products                 - Create a product
//! PATCH  /api/products/{id}            - Partial update
//! DELETE /api/products/{id}            - Delete a product and its image
//! POST   /api/products/{id}/image      - Upload an image (multipart)
//!
//! # Orders
//! GET    /api/orders                   - List orders (?status=, ?limit=)
//! GET    /api/orders/stream            - SSE feed of new order IDs
//! GET    /api/orders/{id}              - Order with items
//! PATCH  /api/orders/{id}/status       - Change status
//!
//! # Notifications
//! GET    /api/notifications            - List (optional ?unread=true)
//! POST   /api/notifications/read-all   - Mark everything read
//! POST   /api/notifications/{id}/read  - Mark one read
//! ```
//!
//! `/health` and `/health/ready` are mounted by the binary. There is no
//! authentication; the admin must only be reachable from a private network.

pub mod categories;
pub mod delivery;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod settings;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
};

use crate::state::AppState;
use crate::storage::MAX_IMAGE_BYTES;

/// Multipart framing on top of the image itself.
const UPLOAD_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create the settings routes router.
pub fn settings_routes() -> Router<AppState> {
    Router::new().route("/", get(settings::index)).route(
        "/{key}",
        get(settings::show)
            .put(settings::update)
            .delete(settings::destroy),
    )
}

/// Create the delivery routes router.
pub fn delivery_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/config",
            get(delivery::show_config).put(delivery::update_config),
        )
        .route("/zones", get(delivery::zones).post(delivery::create_zone))
        .route(
            "/zones/{id}",
            put(delivery::update_zone).delete(delivery::delete_zone),
        )
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/categories",
            get(categories::index).post(categories::create),
        )
        .route(
            "/api/categories/{id}",
            axum::routing::delete(categories::destroy),
        )
        .route("/api/products", get(products::index).post(products::create))
        .route(
            "/api/products/{id}",
            patch(products::update).delete(products::destroy),
        )
        .route(
            "/api/products/{id}/image",
            post(products::upload_image)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + UPLOAD_OVERHEAD_BYTES)),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/stream", get(orders::stream))
        .route("/{id}", get(orders::show))
        .route("/{id}/status", patch(orders::update_status))
}

/// Create the notification routes router.
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::index))
        .route("/read-all", post(notifications::mark_all_read))
        .route("/{id}/read", post(notifications::mark_read))
}

/// Create all routes for the admin API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/settings", settings_routes())
        .nest("/api/delivery", delivery_routes())
        .merge(catalog_routes())
        .nest("/api/orders", order_routes())
        .nest("/api/notifications", notification_routes())
}
