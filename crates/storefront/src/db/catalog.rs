//! Menu queries.

use forno_core::{Category, Product, ProductId};
use sqlx::PgPool;
use tracing::instrument;

use super::RepositoryError;

const PRODUCT_COLUMNS: &str = "id, category_id, name, description, price, image_path, \
     is_available, stock, sort_order, created_at, updated_at";

/// Read-only access to categories and products.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories in menu order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(
            r"
            SELECT id, name, slug, sort_order, created_at, updated_at
            FROM forno.categories
            ORDER BY sort_order, name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// Products currently offered to customers, in menu order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn available_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM forno.products \
             WHERE is_available ORDER BY sort_order, name"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(self.pool)
            .await?;

        Ok(products)
    }

    /// Every product, including unavailable ones. Used to build the search index.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn all_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM forno.products ORDER BY id");
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(self.pool)
            .await?;

        Ok(products)
    }

    /// A single product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this ID.
    #[instrument(skip(self))]
    pub async fn product(&self, id: ProductId) -> Result<Product, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM forno.products WHERE id = $1");
        sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Products with the given IDs. Unknown IDs are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM forno.products WHERE id = ANY($1)");
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(raw)
            .fetch_all(self.pool)
            .await?;

        Ok(products)
    }
}
