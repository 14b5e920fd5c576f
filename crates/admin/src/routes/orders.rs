//! Order list, detail, status changes and the live order feed.

use std::convert::Infallible;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use forno_core::{Order, OrderId, OrderStatus};
use futures::Stream;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, instrument, warn};

use crate::db::{OrderDetail, OrderFilter, OrderRepository};
use crate::error::Result;
use crate::state::AppState;

/// `GET /api/orders`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(OrderRepository::new(state.pool()).list(&filter).await?))
}

/// `GET /api/orders/{id}`
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<OrderId>) -> Result<Json<OrderDetail>> {
    Ok(Json(OrderRepository::new(state.pool()).get(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// `PATCH /api/orders/{id}/status`
///
/// Any status may follow any other.
#[instrument(skip(state, update), fields(status = %update.status))]
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Order>> {
    let order = OrderRepository::new(state.pool())
        .set_status(id, update.status)
        .await?;
    info!(order_id = %id, status = %order.status, "order status changed");
    Ok(Json(order))
}

fn order_event(id: OrderId) -> Option<Event> {
    Event::default()
        .event("order_created")
        .json_data(json!({ "order_id": id }))
        .ok()
}

/// `GET /api/orders/stream`
///
/// One `order_created` event per new order. Dashboards fetch the detail
/// themselves.
pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let mut orders = state.order_events().subscribe();

    let stream = async_stream::stream! {
        loop {
            match orders.recv().await {
                Ok(id) => {
                    if let Some(event) = order_event(id) {
                        yield Ok(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Order stream subscriber lagged");
                }
                Err(RecvError::Closed) => {
                    debug!("Order channel closed");
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use futures::StreamExt;
    use tower::ServiceExt;

    use super::*;
    use crate::routes::test_support::memory_state;

    #[tokio::test]
    async fn test_stream_relays_new_orders() {
        let state = memory_state();
        let response = crate::routes::routes()
            .with_state(state.clone())
            .oneshot(Request::get("/api/orders/stream").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        state.order_events().send(OrderId::new(17)).unwrap();

        let mut frames = response.into_body().into_data_stream();
        let frame = tokio::time::timeout(Duration::from_secs(5), frames.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let text = String::from_utf8(frame.to_vec()).unwrap();

        assert!(text.contains("event: order_created"));
        assert!(text.contains(r#"{"order_id":17}"#));
    }

    #[tokio::test]
    async fn test_unknown_status_rejected() {
        let response = crate::routes::routes()
            .with_state(memory_state())
            .oneshot(
                Request::patch("/api/orders/3/status")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"status": "eaten"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_status_update_body() {
        let update: StatusUpdate =
            serde_json::from_str(r#"{"status": "out_for_delivery"}"#).unwrap();
        assert_eq!(update.status, OrderStatus::OutForDelivery);
    }
}
