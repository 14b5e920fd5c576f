//! Menu search.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Result;
use crate::search::SearchHit;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 50;
const MAX_QUERY_LENGTH: usize = 200;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
    /// Only return products that can be ordered right now.
    #[serde(default)]
    pub available: bool,
}

/// Response body for `GET /api/search`.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    /// `false` while the first index build is still running.
    pub ready: bool,
    pub results: Vec<SearchHit>,
}

/// `GET /api/search?q=&limit=&available=`
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let query: String = params.q.trim().chars().take(MAX_QUERY_LENGTH).collect();
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let results = if query.is_empty() {
        Vec::new()
    } else {
        state.search().search(&query, limit, params.available)?
    };

    Ok(Json(SearchResponse {
        ready: state.search().is_ready(),
        query,
        results,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use axum::{body::Body, http::Request};
    use chrono::Utc;
    use forno_core::{Category, CategoryId, Product, ProductId};
    use forno_settings::{MemoryBackend, SettingsStore};
    use rust_decimal::Decimal;
    use tower::ServiceExt;

    use crate::routes::test_support::{body_json, state_with_settings};
    use crate::search::build_index;

    fn pizza(id: i32, name: &str, available: bool) -> Product {
        Product {
            id: ProductId::new(id),
            category_id: Some(CategoryId::new(1)),
            name: name.into(),
            description: "Tomato and mozzarella".into(),
            price: Decimal::new(850, 2),
            image_path: None,
            is_available: available,
            stock: None,
            sort_order: id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn get(uri: &str, ready: bool) -> serde_json::Value {
        let state = state_with_settings(SettingsStore::new(Arc::new(MemoryBackend::new())));
        if ready {
            let categories = [Category {
                id: CategoryId::new(1),
                name: "Pizze".into(),
                slug: "pizze".into(),
                sort_order: 0,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }];
            let products = [pizza(1, "Margherita", true), pizza(2, "Marinara", false)];
            let (index, fields) = build_index(&products, &categories).unwrap();
            state.search().set_ready(&index, fields).unwrap();
        }

        let response = crate::routes::routes()
            .with_state(state)
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        body_json(response).await
    }

    #[tokio::test]
    async fn test_search_before_index_is_built() {
        let body = get("/api/search?q=margherita", false).await;
        assert_eq!(body["ready"], false);
        assert_eq!(body["results"].as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn test_search_available_only() {
        let body = get("/api/search?q=mar&available=true", true).await;
        assert_eq!(body["ready"], true);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["name"], "Margherita");
    }

    #[tokio::test]
    async fn test_blank_query_returns_nothing() {
        let body = get("/api/search?q=%20%20", true).await;
        assert_eq!(body["query"], "");
        assert_eq!(body["results"].as_array().map(Vec::len), Some(0));
    }
}
