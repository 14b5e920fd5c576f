//! Product management and image uploads.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use forno_core::{CategoryId, Product, ProductId};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::db::{NewProduct, ProductPatch, ProductRepository};
use crate::error::{AppError, Result};
use crate::services::{CatalogService, DeleteSummary};
use crate::state::AppState;
use crate::storage::StorageClient;

/// Multipart field carrying the image.
const IMAGE_FIELD: &str = "file";

/// A product with its public image URL resolved.
#[derive(Debug, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub image_url: Option<String>,
}

impl ProductView {
    fn new(product: Product, storage: &StorageClient) -> Self {
        let image_url = product.image_path.as_deref().map(|p| storage.public_url(p));
        Self { product, image_url }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category_id: Option<CategoryId>,
}

/// `GET /api/products`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ProductView>>> {
    let products = ProductRepository::new(state.pool()).list(query.category_id).await?;
    Ok(Json(
        products
            .into_iter()
            .map(|p| ProductView::new(p, state.storage()))
            .collect(),
    ))
}

fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".into()));
    }
    Ok(())
}

fn check_price(price: rust_decimal::Decimal) -> Result<()> {
    if price.is_sign_negative() {
        return Err(AppError::BadRequest("Price must not be negative".into()));
    }
    Ok(())
}

fn check_stock(stock: Option<i32>) -> Result<()> {
    if stock.is_some_and(|s| s < 0) {
        return Err(AppError::BadRequest("Stock must not be negative".into()));
    }
    Ok(())
}

/// `POST /api/products`
#[instrument(skip(state, input), fields(name = %input.name))]
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<NewProduct>,
) -> Result<(StatusCode, Json<ProductView>)> {
    check_name(&input.name)?;
    check_price(input.price)?;
    check_stock(input.stock)?;

    let product = ProductRepository::new(state.pool()).create(&input).await?;
    info!(product_id = %product.id, "product created");
    Ok((StatusCode::CREATED, Json(ProductView::new(product, state.storage()))))
}

/// `PATCH /api/products/{id}`
#[instrument(skip(state, patch))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(patch): Json<ProductPatch>,
) -> Result<Json<ProductView>> {
    if patch.is_empty() {
        return Err(AppError::BadRequest("Nothing to update".into()));
    }
    if let Some(name) = &patch.name {
        check_name(name)?;
    }
    if let Some(price) = patch.price {
        check_price(price)?;
    }
    check_stock(patch.stock.flatten())?;

    let product = ProductRepository::new(state.pool()).update(id, &patch).await?;
    Ok(Json(ProductView::new(product, state.storage())))
}

/// `DELETE /api/products/{id}`
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<DeleteSummary>> {
    let summary = CatalogService::new(state.pool(), state.storage())
        .delete_product(id)
        .await?;
    Ok(Json(summary))
}

/// `POST /api/products/{id}/image`
///
/// Expects a multipart form with the image in the `file` field.
#[instrument(skip(state, multipart))]
pub async fn upload_image(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    mut multipart: Multipart,
) -> Result<Json<ProductView>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let product = CatalogService::new(state.pool(), state.storage())
            .replace_image(id, &data, &content_type)
            .await?;
        return Ok(Json(ProductView::new(product, state.storage())));
    }

    Err(AppError::BadRequest(format!(
        "Missing '{IMAGE_FIELD}' field in multipart body"
    )))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, header};
    use tower::ServiceExt;

    use super::*;
    use crate::routes::test_support::{body_json, memory_state};

    const BOUNDARY: &str = "forno-test-boundary";

    fn multipart(field: &str, content_type: &str, data: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"photo\"\r\n\
             Content-Type: {content_type}\r\n\r\n\
             {data}\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::post("/api/products/1/image")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(request: Request<Body>) -> axum::response::Response {
        crate::routes::routes()
            .with_state(memory_state())
            .oneshot(request)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_rejects_non_images() {
        let response = send(multipart("file", "application/pdf", "%PDF-1.7")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("application/pdf"));
    }

    #[tokio::test]
    async fn test_upload_requires_file_field() {
        let response = send(multipart("picture", "image/png", "png")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_empty_patch_rejected() {
        let response = send(
            Request::patch("/api/products/1")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_negative_price_rejected() {
        let response = send(
            Request::post("/api/products")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"name": "Margherita", "price": "-7.50"}"#))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_view_resolves_public_url() {
        let config = crate::config::tests::storage_config("https://cdn.test/storage/v1");
        let storage = StorageClient::new(&config).unwrap();
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": 4,
            "category_id": null,
            "name": "Diavola",
            "description": "",
            "price": "9.00",
            "image_path": "products/4/abc.webp",
            "is_available": true,
            "stock": null,
            "sort_order": 0,
            "created_at": "2026-03-01T12:00:00Z",
            "updated_at": "2026-03-01T12:00:00Z"
        }))
        .unwrap();

        let view = serde_json::to_value(ProductView::new(product, &storage)).unwrap();
        assert_eq!(
            view["image_url"],
            "https://cdn.test/storage/v1/object/public/product-images/products/4/abc.webp"
        );
        assert_eq!(view["name"], "Diavola");
    }
}
