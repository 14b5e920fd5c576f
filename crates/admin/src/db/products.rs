//! Product writes.

use forno_core::{CategoryId, Product, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use sqlx::PgPool;
use tracing::instrument;

use super::RepositoryError;

const PRODUCT_COLUMNS: &str = "id, category_id, name, description, price, image_path, \
     is_available, stock, sort_order, created_at, updated_at";

/// Input for a new product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub category_id: Option<CategoryId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default = "default_available")]
    pub is_available: bool,
    /// `None` leaves stock untracked.
    #[serde(default)]
    pub stock: Option<i32>,
    #[serde(default)]
    pub sort_order: i32,
}

const fn default_available() -> bool {
    true
}

/// Partial product update. Absent fields are left alone.
///
/// `category_id` and `stock` are nullable columns, so they distinguish
/// "absent" (`None`) from "set to null" (`Some(None)`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<CategoryId>>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub is_available: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub stock: Option<Option<i32>>,
    pub sort_order: Option<i32>,
}

impl ProductPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.category_id.is_none()
            && self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.is_available.is_none()
            && self.stock.is_none()
            && self.sort_order.is_none()
    }
}

/// Present-but-null becomes `Some(None)`; absence stays `None` via `default`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All products, optionally limited to one category.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, category: Option<CategoryId>) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM forno.products \
             WHERE ($1::INT IS NULL OR category_id = $1) \
             ORDER BY sort_order, name"
        );
        Ok(sqlx::query_as::<_, Product>(&sql)
            .bind(category)
            .fetch_all(self.pool)
            .await?)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get(&self, id: ProductId) -> Result<Product, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM forno.products WHERE id = $1");
        sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for an unknown category or a
    /// negative price or stock.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: &NewProduct) -> Result<Product, RepositoryError> {
        let sql = format!(
            "INSERT INTO forno.products \
             (category_id, name, description, price, is_available, stock, sort_order) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&sql)
            .bind(input.category_id)
            .bind(input.name.trim())
            .bind(input.description.trim())
            .bind(input.price)
            .bind(input.is_available)
            .bind(input.stock)
            .bind(input.sort_order)
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "unknown category or invalid value"))
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist, or
    /// `RepositoryError::Conflict` for an unknown category or invalid value.
    #[instrument(skip(self, patch), fields(product_id = %id))]
    pub async fn update(&self, id: ProductId, patch: &ProductPatch) -> Result<Product, RepositoryError> {
        let sql = format!(
            "UPDATE forno.products SET \
                category_id = CASE WHEN $2 THEN $3 ELSE category_id END, \
                name = COALESCE($4, name), \
                description = COALESCE($5, description), \
                price = COALESCE($6, price), \
                is_available = COALESCE($7, is_available), \
                stock = CASE WHEN $8 THEN $9 ELSE stock END, \
                sort_order = COALESCE($10, sort_order) \
             WHERE id = $1 \
             RETURNING {PRODUCT_COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(patch.category_id.is_some())
            .bind(patch.category_id.flatten())
            .bind(patch.name.as_deref().map(str::trim))
            .bind(patch.description.as_deref().map(str::trim))
            .bind(patch.price)
            .bind(patch.is_available)
            .bind(patch.stock.is_some())
            .bind(patch.stock.flatten())
            .bind(patch.sort_order)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "unknown category or invalid value"))?
            .ok_or(RepositoryError::NotFound)
    }

    /// Set or clear the stored image path.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn set_image(&self, id: ProductId, path: Option<&str>) -> Result<Product, RepositoryError> {
        let sql = format!(
            "UPDATE forno.products SET image_path = $2 WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(path)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM forno.products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_distinguishes_null_from_absent() {
        let patch: ProductPatch = serde_json::from_str(r#"{"stock": null}"#).unwrap();
        assert_eq!(patch.stock, Some(None));
        assert_eq!(patch.category_id, None);

        let patch: ProductPatch = serde_json::from_str(r#"{"stock": 12, "price": "9.50"}"#).unwrap();
        assert_eq!(patch.stock, Some(Some(12)));
        assert_eq!(patch.price, Some(Decimal::new(950, 2)));
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_empty_patch() {
        let patch: ProductPatch = serde_json::from_str("{}").unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn test_new_product_defaults() {
        let input: NewProduct =
            serde_json::from_str(r#"{"category_id": 1, "name": "Diavola", "price": "9.00"}"#)
                .unwrap();
        assert!(input.is_available);
        assert!(input.stock.is_none());
        assert_eq!(input.category_id, Some(CategoryId::new(1)));
    }
}
