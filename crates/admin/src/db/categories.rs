//! Category writes.

use forno_core::{Category, CategoryId};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use super::RepositoryError;

const CATEGORY_COLUMNS: &str = "id, name, slug, sort_order, created_at, updated_at";

/// Input for a new category.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    /// Derived from the name when omitted.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

/// Turn a display name into a URL slug: lowercase ASCII letters and digits
/// separated by single dashes.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
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
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM forno.categories ORDER BY sort_order, name"
        );
        Ok(sqlx::query_as::<_, Category>(&sql)
            .fetch_all(self.pool)
            .await?)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: &NewCategory, slug: &str) -> Result<Category, RepositoryError> {
        let sql = format!(
            "INSERT INTO forno.categories (name, slug, sort_order) VALUES ($1, $2, $3) \
             RETURNING {CATEGORY_COLUMNS}"
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(input.name.trim())
            .bind(slug)
            .bind(input.sort_order)
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "a category with this slug already exists"))
    }

    /// Delete a category row. Its products must be handled first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM forno.categories WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
