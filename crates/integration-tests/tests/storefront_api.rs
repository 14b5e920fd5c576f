//! Integration tests for the public storefront API.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The admin server running (cargo run -p forno-admin)
//! - The storefront server running (cargo run -p forno-storefront)

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]

use forno_integration_tests::{
    admin_base_url, client, create_category, create_product, delete_category, storefront_base_url,
    unique,
};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_health_and_readiness() {
    let client = client();
    for path in ["/health", "/health/ready"] {
        let resp = client
            .get(format!("{}{path}", storefront_base_url()))
            .send()
            .await
            .expect("Failed to reach storefront");
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
    }
}

#[tokio::test]
#[ignore = "Requires running storefront and admin servers"]
async fn test_menu_hides_unavailable_products() {
    let client = client();
    let category = create_category(&client, &unique("Pizze")).await;
    let visible = create_product(&client, &category["id"], json!({ "name": "Margherita", "price": "7.50" })).await;
    let hidden = create_product(
        &client,
        &category["id"],
        json!({ "name": "Stagionale", "price": "11.00", "is_available": false }),
    )
    .await;

    let menu: Value = client
        .get(format!("{}/api/menu", storefront_base_url()))
        .send()
        .await
        .expect("Failed to fetch menu")
        .json()
        .await
        .expect("Invalid menu JSON");

    let section = menu["sections"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["category"]["id"] == category["id"])
        .expect("category missing from menu");
    let ids: Vec<&Value> = section["products"].as_array().unwrap().iter().map(|p| &p["id"]).collect();
    assert!(ids.contains(&&visible["id"]));
    assert!(!ids.contains(&&hidden["id"]));

    delete_category(&client, &category["id"]).await;
}

#[tokio::test]
#[ignore = "Requires running storefront and admin servers"]
async fn test_content_changes_are_served() {
    let client = client();
    let text = unique("We now open on **Mondays**");

    let resp = client
        .put(format!("{}/api/settings/content.about", admin_base_url()))
        .json(&json!(text))
        .send()
        .await
        .expect("Failed to write setting");
    assert_eq!(resp.status(), StatusCode::OK);

    // The storefront learns about the write through LISTEN/NOTIFY; give it a moment.
    let mut served = Value::Null;
    for _ in 0..20 {
        served = client
            .get(format!("{}/api/content/content.about?format=html", storefront_base_url()))
            .send()
            .await
            .expect("Failed to fetch content")
            .json()
            .await
            .expect("Invalid content JSON");
        if served["value"] == json!(text) {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    }
    assert_eq!(served["value"], json!(text));
    assert!(served["html"].as_str().unwrap().contains("<strong>Mondays</strong>"));
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_private_settings_are_hidden() {
    let resp = client()
        .get(format!("{}/api/content/geocoding.api_key", storefront_base_url()))
        .send()
        .await
        .expect("Failed to reach storefront");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
