//! Delivery zones and address validation.

use axum::{Json, extract::State};
use forno_core::{DeliveryValidation, DeliveryZone};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::state::AppState;

const MAX_ADDRESS_LENGTH: usize = 300;

/// Response body for `GET /api/delivery/zones`.
#[derive(Debug, Serialize)]
pub struct ZonesResponse {
    /// Whether delivery is configured at all.
    pub enabled: bool,
    pub max_distance_km: Option<f64>,
    pub free_delivery_threshold: Option<Decimal>,
    pub zones: Vec<DeliveryZone>,
}

/// `GET /api/delivery/zones`
#[instrument(skip(state))]
pub async fn zones(State(state): State<AppState>) -> Json<ZonesResponse> {
    let config = state.delivery().config().await;
    let mut zones = if config.is_some() {
        state.delivery().zones().await
    } else {
        Vec::new()
    };
    zones.sort_by(|a, b| a.max_distance_km.total_cmp(&b.max_distance_km));

    Json(ZonesResponse {
        enabled: config.is_some(),
        max_distance_km: config.as_ref().map(|c| c.max_distance_km),
        free_delivery_threshold: config.and_then(|c| c.free_delivery_threshold),
        zones,
    })
}

/// Request body for `POST /api/delivery/validate`.
#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub address: String,
    #[serde(default)]
    pub order_amount: Decimal,
}

/// `POST /api/delivery/validate`
///
/// Always answers 200 with a [`DeliveryValidation`] once the input is
/// well-formed; unreachable addresses are reported in the body.
#[instrument(skip(state, request))]
pub async fn validate(
    State(state): State<AppState>,
    Json(request): Json<ValidateRequest>,
) -> Result<Json<DeliveryValidation>> {
    if request.address.len() > MAX_ADDRESS_LENGTH {
        return Err(AppError::BadRequest("Address is too long".to_string()));
    }
    if request.order_amount.is_sign_negative() {
        return Err(AppError::BadRequest(
            "Order amount cannot be negative".to_string(),
        ));
    }

    let validation = state
        .delivery()
        .resolve(&request.address, request.order_amount)
        .await;
    Ok(Json(validation))
}
