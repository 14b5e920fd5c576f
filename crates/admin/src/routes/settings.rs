//! Generic settings CRUD.
//!
//! Any well-formed key may be written; the storefront decides what it
//! exposes publicly. `delivery.config` is checked the same way as through
//! `PUT /api/delivery/config`.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use forno_core::keys;
use forno_settings::SettingRecord;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{info, instrument};

use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub prefix: Option<String>,
}

/// `GET /api/settings`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SettingRecord>>> {
    let prefix = query.prefix.as_deref().filter(|p| !p.is_empty());
    Ok(Json(state.settings().list(prefix).await?))
}

/// `GET /api/settings/{key}`
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(key): Path<String>) -> Result<Json<SettingRecord>> {
    state
        .settings()
        .record(&key)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound(key))
}

/// `PUT /api/settings/{key}`
#[instrument(skip(state, value))]
pub async fn update(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(value): Json<JsonValue>,
) -> Result<Json<SettingRecord>> {
    if !keys::is_valid_key(&key) {
        return Err(AppError::BadRequest(format!(
            "invalid key (lowercase letters, digits, '.', '_' and '-', at most {} characters)",
            keys::MAX_KEY_LENGTH
        )));
    }
    if key == keys::DELIVERY_CONFIG {
        super::delivery::parse_config(value.clone())?;
    }
    let record = state.settings().set(&key, value).await?;
    info!(key = %key, "setting updated");
    Ok(Json(record))
}

/// `DELETE /api/settings/{key}`
#[instrument(skip(state))]
pub async fn destroy(State(state): State<AppState>, Path(key): Path<String>) -> Result<StatusCode> {
    if state.settings().delete(&key).await? {
        info!(key = %key, "setting deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(key))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, header};
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::routes::test_support::{body_json, memory_state};

    fn put(uri: &str, body: &JsonValue) -> Request<Body> {
        Request::put(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_put_then_list_by_prefix() {
        let state = memory_state();
        let app = crate::routes::routes().with_state(state.clone());

        let response = app
            .clone()
            .oneshot(put("/api/settings/content.offers", &json!(["2x1 on Tuesdays"])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        app.clone()
            .oneshot(put("/api/settings/geocoding.api_key", &json!("AIza-test")))
            .await
            .unwrap();

        let response = app
            .oneshot(Request::get("/api/settings?prefix=content.").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        let listed = body.as_array().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["key"], "content.offers");
        assert_eq!(listed[0]["value"][0], "2x1 on Tuesdays");
    }

    #[tokio::test]
    async fn test_invalid_key_is_rejected() {
        let response = crate::routes::routes()
            .with_state(memory_state())
            .oneshot(put("/api/settings/Content.Hero", &json!("x")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delivery_config_is_validated_on_generic_put() {
        let state = memory_state();
        let app = crate::routes::routes().with_state(state.clone());

        for bad in [
            json!({ "origin": { "lat": 450.0, "lng": 9.0 }, "max_distance_km": 8.0 }),
            json!({
                "origin": { "lat": 45.0, "lng": 9.0 },
                "max_distance_km": 8.0,
                "free_delivery_threshold": "-5"
            }),
            json!("not an object"),
        ] {
            let response = app
                .clone()
                .oneshot(put("/api/settings/delivery.config", &bad))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{bad}");
        }
        assert_eq!(state.settings().get(keys::DELIVERY_CONFIG).await.unwrap(), None);

        let response = app
            .oneshot(put(
                "/api/settings/delivery.config",
                &json!({ "origin": { "lat": 45.0, "lng": 9.0 }, "max_distance_km": 8.0 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_key_and_delete() {
        let state = memory_state();
        state.settings().set("content.hero", json!({ "title": "Ciao" })).await.unwrap();
        let app = crate::routes::routes().with_state(state);

        let response = app
            .clone()
            .oneshot(Request::get("/api/settings/content.about").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .clone()
            .oneshot(Request::delete("/api/settings/content.hero").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(Request::delete("/api/settings/content.hero").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
