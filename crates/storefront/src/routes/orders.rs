//! Order placement.

use axum::{Json, extract::State, http::StatusCode};
use forno_core::Order;
use tracing::instrument;

use crate::error::Result;
use crate::services::{OrderService, PlaceOrderRequest};
use crate::state::AppState;

/// `POST /api/orders`
///
/// Answers 201 with the stored order. Validation problems are 400s; a
/// delivery address outside every zone returns the full validation as body.
#[instrument(skip(state, request))]
pub async fn place(
    State(state): State<AppState>,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = OrderService::new(state.pool(), state.delivery())
        .place(request)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, header},
    };
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::routes::test_support::{body_json, state_with};
    use crate::services::delivery::tests::{StubGeocoder, configured_settings};

    fn order_request(body: &serde_json::Value, ip: &str) -> Request<Body> {
        Request::post("/api/orders")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", ip)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn bad_phone_order() -> serde_json::Value {
        json!({
            "customer_name": "Giulia",
            "customer_phone": "call me",
            "fulfillment": "pickup",
            "items": [{ "product_id": 1, "quantity": 2 }]
        })
    }

    #[tokio::test]
    async fn test_invalid_customer_is_bad_request() {
        let state = state_with(configured_settings().await, StubGeocoder::nothing(), vec![]);
        let response = crate::routes::routes()
            .with_state(state)
            .oneshot(order_request(&bad_phone_order(), "203.0.113.50"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_fulfillment_is_rejected() {
        let state = state_with(configured_settings().await, StubGeocoder::nothing(), vec![]);
        let mut body = bad_phone_order();
        body["fulfillment"] = json!("drone");

        let response = crate::routes::routes()
            .with_state(state)
            .oneshot(order_request(&body, "203.0.113.51"))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_order_placement_is_rate_limited() {
        let state = state_with(configured_settings().await, StubGeocoder::nothing(), vec![]);
        let app = crate::routes::routes().with_state(state);

        let mut statuses = Vec::new();
        for _ in 0..6 {
            let response = app
                .clone()
                .oneshot(order_request(&bad_phone_order(), "203.0.113.52"))
                .await
                .unwrap();
            statuses.push(response.status());
        }

        assert!(statuses[..5].iter().all(|s| *s == StatusCode::BAD_REQUEST));
        assert_eq!(statuses[5], StatusCode::TOO_MANY_REQUESTS);
    }
}
