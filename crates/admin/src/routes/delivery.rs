//! Delivery configuration and zone management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use forno_core::{DeliveryConfig, DeliveryZone, ZoneId, keys};
use serde_json::Value as JsonValue;
use tracing::{info, instrument};

use crate::db::{ZoneInput, ZoneRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// `GET /api/delivery/config`
#[instrument(skip(state))]
pub async fn show_config(State(state): State<AppState>) -> Result<Json<DeliveryConfig>> {
    state
        .settings()
        .get_typed::<DeliveryConfig>(keys::DELIVERY_CONFIG)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(keys::DELIVERY_CONFIG.to_string()))
}

/// Parse and check a delivery config. Shape and range problems are both 400s.
pub(crate) fn parse_config(value: JsonValue) -> Result<DeliveryConfig> {
    let config: DeliveryConfig =
        serde_json::from_value(value).map_err(|e| AppError::BadRequest(e.to_string()))?;
    config
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(config)
}

/// `PUT /api/delivery/config`
#[instrument(skip(state, value))]
pub async fn update_config(
    State(state): State<AppState>,
    Json(value): Json<JsonValue>,
) -> Result<Json<DeliveryConfig>> {
    let config = parse_config(value)?;

    state.settings().set_typed(keys::DELIVERY_CONFIG, &config).await?;
    info!(max_distance_km = config.max_distance_km, "delivery config updated");
    Ok(Json(config))
}

/// `GET /api/delivery/zones`
#[instrument(skip(state))]
pub async fn zones(State(state): State<AppState>) -> Result<Json<Vec<DeliveryZone>>> {
    Ok(Json(ZoneRepository::new(state.pool()).list().await?))
}

fn validated(input: ZoneInput) -> Result<ZoneInput> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(input)
}

/// `POST /api/delivery/zones`
#[instrument(skip(state, input))]
pub async fn create_zone(
    State(state): State<AppState>,
    Json(input): Json<ZoneInput>,
) -> Result<(StatusCode, Json<DeliveryZone>)> {
    let input = validated(input)?;
    let zone = ZoneRepository::new(state.pool()).create(&input).await?;
    info!(zone_id = %zone.id, "delivery zone created");
    Ok((StatusCode::CREATED, Json(zone)))
}

/// `PUT /api/delivery/zones/{id}`
#[instrument(skip(state, input))]
pub async fn update_zone(
    State(state): State<AppState>,
    Path(id): Path<ZoneId>,
    Json(input): Json<ZoneInput>,
) -> Result<Json<DeliveryZone>> {
    let input = validated(input)?;
    Ok(Json(ZoneRepository::new(state.pool()).update(id, &input).await?))
}

/// `DELETE /api/delivery/zones/{id}`
#[instrument(skip(state))]
pub async fn delete_zone(State(state): State<AppState>, Path(id): Path<ZoneId>) -> Result<StatusCode> {
    ZoneRepository::new(state.pool()).delete(id).await?;
    info!(zone_id = %id, "delivery zone deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, header};
    use serde_json::{Value as JsonValue, json};
    use tower::ServiceExt;

    use super::*;
    use crate::routes::test_support::{body_json, memory_state};

    fn json_request(method: &str, uri: &str, body: &JsonValue) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_config_round_trip() {
        let app = crate::routes::routes().with_state(memory_state());

        let response = app
            .clone()
            .oneshot(Request::get("/api/delivery/config").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let config = json!({
            "origin": { "lat": 45.46, "lng": 9.19 },
            "max_distance_km": 8.0,
            "free_delivery_threshold": "25.00"
        });
        let response = app
            .clone()
            .oneshot(json_request("PUT", "/api/delivery/config", &config))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/api/delivery/config").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["max_distance_km"], 8.0);
        assert_eq!(body["free_delivery_threshold"], "25.00");
    }

    #[tokio::test]
    async fn test_config_validation() {
        let app = crate::routes::routes().with_state(memory_state());

        for bad in [
            json!({ "origin": { "lat": 91.0, "lng": 9.0 }, "max_distance_km": 8.0 }),
            json!({ "origin": { "lat": 45.0, "lng": 9.0 }, "max_distance_km": 0.0 }),
            json!({
                "origin": { "lat": 45.0, "lng": 9.0 },
                "max_distance_km": 5.0,
                "free_delivery_threshold": "-1"
            }),
        ] {
            let response = app
                .clone()
                .oneshot(json_request("PUT", "/api/delivery/config", &bad))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{bad}");
        }
    }

    #[tokio::test]
    async fn test_invalid_zone_rejected_before_database() {
        let response = crate::routes::routes()
            .with_state(memory_state())
            .oneshot(json_request(
                "POST",
                "/api/delivery/zones",
                &json!({ "name": "  ", "max_distance_km": 3.0, "fee": "2.50" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
