//! Category management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use forno_core::{Category, CategoryId};
use tracing::{info, instrument};

use crate::db::categories::slugify;
use crate::db::{CategoryRepository, NewCategory};
use crate::error::{AppError, Result};
use crate::services::{CatalogService, DeleteSummary};
use crate::state::AppState;

/// `GET /api/categories`
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(CategoryRepository::new(state.pool()).list().await?))
}

/// Slug for a new category: the given one normalized, or one derived from
/// the name.
fn category_slug(input: &NewCategory) -> Result<String> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".into()));
    }
    let source = input
        .slug
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(&input.name);
    let slug = slugify(source);
    if slug.is_empty() {
        return Err(AppError::BadRequest(
            "Slug must contain at least one letter or digit".into(),
        ));
    }
    Ok(slug)
}

/// `POST /api/categories`
#[instrument(skip(state, input), fields(name = %input.name))]
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<NewCategory>,
) -> Result<(StatusCode, Json<Category>)> {
    let slug = category_slug(&input)?;
    let category = CategoryRepository::new(state.pool()).create(&input, &slug).await?;
    info!(category_id = %category.id, slug = %category.slug, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// `DELETE /api/categories/{id}`
///
/// Removes every product in the category first, images included.
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<DeleteSummary>> {
    let summary = CatalogService::new(state.pool(), state.storage())
        .delete_category(id)
        .await?;
    Ok(Json(summary))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, header};
    use tower::ServiceExt;

    use super::*;

    fn new_category(name: &str, slug: Option<&str>) -> NewCategory {
        NewCategory {
            name: name.into(),
            slug: slug.map(Into::into),
            sort_order: 0,
        }
    }

    #[test]
    fn test_slug_from_name_or_input() {
        assert_eq!(category_slug(&new_category("Pizze Bianche", None)).unwrap(), "pizze-bianche");
        assert_eq!(
            category_slug(&new_category("Pizze Bianche", Some("White Pizza"))).unwrap(),
            "white-pizza"
        );
        assert_eq!(category_slug(&new_category("Wraps", Some("  "))).unwrap(), "wraps");
    }

    #[test]
    fn test_unusable_names_rejected() {
        assert!(category_slug(&new_category("   ", None)).is_err());
        assert!(category_slug(&new_category("Dolci", Some("!!!"))).is_err());
    }

    #[tokio::test]
    async fn test_blank_name_rejected_before_database() {
        let response = crate::routes::routes()
            .with_state(crate::routes::test_support::memory_state())
            .oneshot(
                Request::post("/api/categories")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name": ""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
