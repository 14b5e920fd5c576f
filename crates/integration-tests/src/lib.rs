//! Integration tests for Forno.
//!
//! # Running Tests
//!
//! ```bash
//! # Migrate and start both servers against a scratch database
//! cargo run -p forno-cli -- migrate
//! cargo run -p forno-admin &
//! cargo run -p forno-storefront &
//!
//! # Run the ignored tests
//! cargo test -p forno-integration-tests -- --ignored
//! ```
//!
//! The tests create their own categories, products and zones with unique
//! names and remove them afterwards. They do change `delivery.config`.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_BASE_URL` - default `http://localhost:3000`
//! - `ADMIN_BASE_URL` - default `http://localhost:3001`

use reqwest::Client;
use serde_json::{Value, json};

/// Base URL for the storefront API.
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Base URL for the admin API.
#[must_use]
pub fn admin_base_url() -> String {
    std::env::var("ADMIN_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

/// HTTP client for the tests.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
#[allow(clippy::expect_used)]
pub fn client() -> Client {
    Client::builder()
        .build()
        .expect("Failed to create HTTP client")
}

/// A short random suffix so parallel runs do not collide.
#[must_use]
pub fn unique(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix} {}", id.get(..8).unwrap_or(&id))
}

/// Create a category through the admin API and return its JSON.
///
/// # Panics
///
/// Panics if the request fails or is rejected.
#[allow(clippy::expect_used)]
pub async fn create_category(client: &Client, name: &str) -> Value {
    let resp = client
        .post(format!("{}/api/categories", admin_base_url()))
        .json(&json!({ "name": name }))
        .send()
        .await
        .expect("Failed to create category");
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    resp.json().await.expect("Invalid category JSON")
}

/// Create a product through the admin API and return its JSON.
///
/// # Panics
///
/// Panics if the request fails or is rejected.
#[allow(clippy::expect_used)]
pub async fn create_product(client: &Client, category_id: &Value, body: Value) -> Value {
    let mut body = body;
    body["category_id"] = category_id.clone();
    let resp = client
        .post(format!("{}/api/products", admin_base_url()))
        .json(&body)
        .send()
        .await
        .expect("Failed to create product");
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    resp.json().await.expect("Invalid product JSON")
}

/// Delete a category (and its products) via the admin API. Best-effort.
pub async fn delete_category(client: &Client, category_id: &Value) {
    let _ = client
        .delete(format!("{}/api/categories/{category_id}", admin_base_url()))
        .send()
        .await;
}
