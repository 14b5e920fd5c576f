//! Site information: brand defaults overlaid with `branding.*` settings.

use std::collections::BTreeMap;

use axum::{Json, extract::State};
use forno_core::{Brand, CurrencyCode, keys};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::instrument;

use crate::error::Result;
use crate::state::AppState;

/// Response body for `GET /api/site`.
#[derive(Debug, Serialize)]
pub struct SiteInfo {
    pub brand: Brand,
    pub name: String,
    pub primary_color: String,
    pub currency: CurrencyCode,
    pub opening_hours: Option<JsonValue>,
    /// Every `branding.*` setting, keyed without the prefix.
    pub branding: BTreeMap<String, JsonValue>,
}

impl SiteInfo {
    fn build(brand: Brand, currency: CurrencyCode, branding: BTreeMap<String, JsonValue>) -> Self {
        let text = |key: &str| {
            branding
                .get(key.trim_start_matches("branding."))
                .and_then(JsonValue::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
        };

        Self {
            brand,
            name: text(keys::BRANDING_NAME).unwrap_or_else(|| brand.default_name().to_string()),
            primary_color: text(keys::BRANDING_PRIMARY_COLOR)
                .unwrap_or_else(|| brand.default_primary_color().to_string()),
            currency,
            opening_hours: branding
                .get(keys::BRANDING_OPENING_HOURS.trim_start_matches("branding."))
                .cloned(),
            branding,
        }
    }
}

/// `GET /api/site`
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>) -> Result<Json<SiteInfo>> {
    let branding = state
        .settings()
        .list(Some("branding."))
        .await?
        .into_iter()
        .map(|record| {
            let name = record.key.trim_start_matches("branding.").to_string();
            (name, record.value)
        })
        .collect();

    let config = state.config();
    Ok(Json(SiteInfo::build(config.brand, config.currency, branding)))
}
