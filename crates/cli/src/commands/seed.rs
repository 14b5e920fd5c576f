//! Seed the menu, delivery zones and settings from a YAML file.
//!
//! ```yaml
//! settings:
//!   branding.name: "Forno Centrale"
//!   content.about: "Wood-fired since 1987."
//! delivery:
//!   config:
//!     origin: { lat: 45.4642, lng: 9.19 }
//!     max_distance_km: 8
//!     free_delivery_threshold: "30.00"
//!   zones:
//!     - { name: Centro, max_distance_km: 3, fee: "1.50", estimated_time: "20-30 min" }
//! categories:
//!   - name: Pizze Rosse
//!     products:
//!       - { name: Margherita, price: "7.50", description: "Tomato, mozzarella, basil" }
//! ```
//!
//! The whole file is validated before anything is written. Categories whose
//! slug already exists are skipped along with their products, so re-running
//! the same file does not duplicate the menu.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use forno_admin::db::categories::slugify;
use forno_admin::db::{
    CategoryRepository, NewCategory, NewProduct, ProductRepository, ZoneInput, ZoneRepository,
};
use forno_core::{DeliveryConfig, keys};
use forno_settings::{PgSettingsBackend, SettingsStore};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{error, info, warn};

use super::database_url;

/// Top-level seed file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MenuSeed {
    #[serde(default)]
    pub settings: BTreeMap<String, JsonValue>,
    #[serde(default)]
    pub delivery: Option<DeliverySeed>,
    #[serde(default)]
    pub categories: Vec<CategorySeed>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeliverySeed {
    #[serde(default)]
    pub config: Option<DeliveryConfig>,
    #[serde(default)]
    pub zones: Vec<ZoneInput>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategorySeed {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductSeed {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: Option<i32>,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

const fn default_available() -> bool {
    true
}

impl CategorySeed {
    fn slug(&self) -> String {
        slugify(self.slug.as_deref().unwrap_or(&self.name))
    }
}

/// What a seed run wrote.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub settings: usize,
    pub zones: usize,
    pub categories: usize,
    pub categories_skipped: usize,
    pub products: usize,
}

/// Check a parsed seed file. Returns every problem found.
#[must_use]
pub fn validate_seed(seed: &MenuSeed) -> Vec<String> {
    let mut errors = Vec::new();

    for key in seed.settings.keys() {
        if !keys::is_valid_key(key) {
            errors.push(format!("settings: invalid key '{key}'"));
        }
        if key == keys::DELIVERY_CONFIG {
            errors.push(format!("settings: use the delivery.config section instead of '{key}'"));
        }
    }

    if let Some(delivery) = &seed.delivery {
        if let Some(config) = &delivery.config {
            if let Err(e) = config.validate() {
                errors.push(format!("delivery.config: {e}"));
            }
        }
        for (i, zone) in delivery.zones.iter().enumerate() {
            if let Err(e) = zone.validate() {
                errors.push(format!("delivery.zones[{i}]: {e}"));
            }
        }
    }

    let mut slugs = HashSet::new();
    for category in &seed.categories {
        let slug = category.slug();
        if slug.is_empty() {
            errors.push(format!("category '{}': slug would be empty", category.name));
        } else if !slugs.insert(slug.clone()) {
            errors.push(format!("category '{}': duplicate slug '{slug}'", category.name));
        }

        for product in &category.products {
            let at = format!("category '{}', product '{}'", category.name, product.name);
            if product.name.trim().is_empty() {
                errors.push(format!("{at}: name is required"));
            }
            if product.price.is_sign_negative() {
                errors.push(format!("{at}: price must not be negative"));
            }
            if product.stock.is_some_and(|s| s < 0) {
                errors.push(format!("{at}: stock must not be negative"));
            }
        }
    }

    errors
}

/// Seed from `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or a database write fails.
pub async fn menu(file_path: &str) -> Result<SeedSummary, Box<dyn std::error::Error>> {
    let database_url = database_url("ADMIN_DATABASE_URL")?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading seed file");
    let content = tokio::fs::read_to_string(path).await?;
    let seed: MenuSeed = serde_yaml::from_str(&content)?;

    // Validate before connecting to the database
    let errors = validate_seed(&seed);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = forno_admin::db::create_pool(&database_url).await?;
    info!("Connected to database");

    let mut summary = SeedSummary::default();

    let settings = SettingsStore::new(Arc::new(PgSettingsBackend::new(pool.clone())));
    for (key, value) in &seed.settings {
        settings.set(key, value.clone()).await?;
        summary.settings += 1;
    }

    if let Some(delivery) = &seed.delivery {
        if let Some(config) = &delivery.config {
            settings.set_typed(keys::DELIVERY_CONFIG, config).await?;
            summary.settings += 1;
        }
        let zones = ZoneRepository::new(&pool);
        for zone in &delivery.zones {
            zones.create(zone).await?;
            summary.zones += 1;
        }
    }

    let categories = CategoryRepository::new(&pool);
    let products = ProductRepository::new(&pool);
    let existing: HashSet<String> = categories.list().await?.into_iter().map(|c| c.slug).collect();

    for (position, seed_category) in seed.categories.iter().enumerate() {
        let slug = seed_category.slug();
        if existing.contains(&slug) {
            warn!(slug = %slug, "Category already exists, skipping it and its products");
            summary.categories_skipped += 1;
            continue;
        }

        let input = NewCategory {
            name: seed_category.name.clone(),
            slug: Some(slug.clone()),
            sort_order: i32::try_from(position).unwrap_or(i32::MAX),
        };
        let category = categories.create(&input, &slug).await?;
        summary.categories += 1;

        for (position, product) in seed_category.products.iter().enumerate() {
            products
                .create(&NewProduct {
                    category_id: Some(category.id),
                    name: product.name.clone(),
                    description: product.description.clone(),
                    price: product.price,
                    is_available: product.is_available,
                    stock: product.stock,
                    sort_order: i32::try_from(position).unwrap_or(i32::MAX),
                })
                .await?;
            summary.products += 1;
        }
    }

    info!("Seeding complete!");
    info!("  Settings written: {}", summary.settings);
    info!("  Delivery zones created: {}", summary.zones);
    info!("  Categories created: {}", summary.categories);
    info!("  Categories skipped (already exist): {}", summary.categories_skipped);
    info!("  Products created: {}", summary.products);

    Ok(summary)
}
