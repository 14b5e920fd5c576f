//! Catalog operations that span the database and object storage.
//!
//! Deletes are best-effort in storage: a product row is removed even when
//! its image cannot be, and a category is removed even when some of its
//! products could not be. Failures are logged at `warn` and counted in the
//! returned [`DeleteSummary`].

use forno_core::{CategoryId, Product, ProductId};
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::db::{CategoryRepository, ProductRepository, RepositoryError};
use crate::storage::{StorageClient, StorageError};

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Database(#[from] RepositoryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// What a delete actually removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeleteSummary {
    pub products_deleted: usize,
    pub product_failures: usize,
    pub image_failures: usize,
}

/// Catalog writes that touch object storage.
pub struct CatalogService<'a> {
    pool: &'a PgPool,
    storage: &'a StorageClient,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, storage: &'a StorageClient) -> Self {
        Self { pool, storage }
    }

    /// Store a new product image and point the product at it. The previous
    /// image, if any, is removed afterwards.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` for invalid files or failed uploads,
    /// and `CatalogError::Database` if the product does not exist.
    #[instrument(skip(self, data), fields(product_id = %id, bytes = data.len()))]
    pub async fn replace_image(
        &self,
        id: ProductId,
        data: &[u8],
        content_type: &str,
    ) -> Result<Product, CatalogError> {
        let image_type = StorageClient::validate(data, content_type)?;
        let repo = ProductRepository::new(self.pool);
        let previous = repo.get(id).await?.image_path;

        let path = StorageClient::product_image_path(id, image_type);
        self.storage.upload(&path, data, image_type).await?;

        let product = match repo.set_image(id, Some(&path)).await {
            Ok(product) => product,
            Err(e) => {
                // The row vanished mid-upload; don't leave the object behind.
                remove_image(self.storage, &path).await;
                return Err(e.into());
            }
        };

        if let Some(previous) = previous.filter(|p| *p != path) {
            remove_image(self.storage, &previous).await;
        }
        info!(path = %path, "product image replaced");
        Ok(product)
    }

    /// Delete a product and, best-effort, its image.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: ProductId) -> Result<DeleteSummary, RepositoryError> {
        let repo = ProductRepository::new(self.pool);
        let product = repo.get(id).await?;
        self.delete_loaded(&repo, &product).await
    }

    async fn delete_loaded(
        &self,
        repo: &ProductRepository<'_>,
        product: &Product,
    ) -> Result<DeleteSummary, RepositoryError> {
        let mut summary = DeleteSummary::default();
        if let Some(path) = &product.image_path
            && !remove_image(self.storage, path).await
        {
            summary.image_failures += 1;
        }
        repo.delete(product.id).await?;
        summary.products_deleted = 1;
        Ok(summary)
    }

    /// Delete every product in a category (images included), then the
    /// category itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the products cannot be listed or the category row
    /// cannot be deleted. Per-product failures are only counted.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<DeleteSummary, RepositoryError> {
        let repo = ProductRepository::new(self.pool);
        let products = repo.list(Some(id)).await?;

        let mut summary = DeleteSummary::default();
        for product in &products {
            match self.delete_loaded(&repo, product).await {
                Ok(one) => {
                    summary.products_deleted += one.products_deleted;
                    summary.image_failures += one.image_failures;
                }
                Err(e) => {
                    warn!(error = %e, product_id = %product.id, "failed to delete product in category");
                    summary.product_failures += 1;
                }
            }
        }

        CategoryRepository::new(self.pool).delete(id).await?;
        info!(
            products_deleted = summary.products_deleted,
            product_failures = summary.product_failures,
            image_failures = summary.image_failures,
            "category deleted"
        );
        Ok(summary)
    }
}

/// Delete an object, logging instead of failing. Returns whether it worked.
async fn remove_image(storage: &StorageClient, path: &str) -> bool {
    match storage.delete(path).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, path = %path, "failed to delete product image");
            false
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use httpmock::prelude::*;

    use super::*;
    use crate::config::tests::storage_config;

    #[tokio::test]
    async fn test_remove_image_reports_failure_without_raising() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/object/product-images/products/3/a.png");
                then.status(502);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/object/product-images/products/3/b.png");
                then.status(200);
            })
            .await;

        let storage = StorageClient::new(&storage_config(&server.base_url())).unwrap();
        assert!(!remove_image(&storage, "products/3/a.png").await);
        assert!(remove_image(&storage, "products/3/b.png").await);
    }

    #[test]
    fn test_summary_serializes_counts() {
        let summary = DeleteSummary {
            products_deleted: 3,
            product_failures: 0,
            image_failures: 1,
        };
        let value = serde_json::to_value(summary).unwrap();
        assert_eq!(value["products_deleted"], 3);
        assert_eq!(value["image_failures"], 1);
    }
}
