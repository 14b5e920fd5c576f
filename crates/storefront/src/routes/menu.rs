//! Menu and product detail.

use axum::{
    Json,
    extract::{Path, State},
};
use forno_core::{Category, CategoryId, CurrencyCode, Price, Product, ProductId};
use serde::Serialize;
use tracing::instrument;

use crate::db::CatalogRepository;
use crate::error::Result;
use crate::state::AppState;

/// A product as shown to customers.
#[derive(Debug, Serialize)]
pub struct MenuProduct {
    #[serde(flatten)]
    pub product: Product,
    /// Price formatted with the currency symbol, e.g. `"€8.50"`.
    pub price_display: String,
}

impl MenuProduct {
    fn new(product: Product, currency: CurrencyCode) -> Self {
        let price_display = Price::new(product.price, currency).display();
        Self {
            product,
            price_display,
        }
    }
}

/// One menu section. `category` is `None` for products without a category.
#[derive(Debug, Serialize)]
pub struct MenuSection {
    pub category: Option<Category>,
    pub products: Vec<MenuProduct>,
}

/// Response body for `GET /api/menu`.
#[derive(Debug, Serialize)]
pub struct Menu {
    pub currency: CurrencyCode,
    pub sections: Vec<MenuSection>,
}

/// Group products under their categories.
///
/// Sections follow the category order; empty categories are left out.
/// Products whose category is missing end up in a trailing section.
fn group_menu(
    categories: Vec<Category>,
    products: Vec<Product>,
    currency: CurrencyCode,
) -> Vec<MenuSection> {
    let known: Vec<CategoryId> = categories.iter().map(|c| c.id).collect();
    let (mut loose, mut placed): (Vec<Product>, Vec<Product>) = products
        .into_iter()
        .partition(|p| p.category_id.is_none_or(|id| !known.contains(&id)));

    let mut sections: Vec<MenuSection> = categories
        .into_iter()
        .filter_map(|category| {
            let (mine, rest): (Vec<Product>, Vec<Product>) = std::mem::take(&mut placed)
                .into_iter()
                .partition(|p| p.category_id == Some(category.id));
            placed = rest;
            (!mine.is_empty()).then(|| MenuSection {
                category: Some(category),
                products: mine
                    .into_iter()
                    .map(|p| MenuProduct::new(p, currency))
                    .collect(),
            })
        })
        .collect();

    if !loose.is_empty() {
        loose.sort_by_key(|p| p.sort_order);
        sections.push(MenuSection {
            category: None,
            products: loose
                .into_iter()
                .map(|p| MenuProduct::new(p, currency))
                .collect(),
        });
    }

    sections
}

/// `GET /api/menu`
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Menu>> {
    let repo = CatalogRepository::new(state.pool());
    let categories = repo.categories().await?;
    let products = repo.available_products().await?;
    let currency = state.config().currency;

    Ok(Json(Menu {
        currency,
        sections: group_menu(categories, products, currency),
    }))
}

/// `GET /api/products/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<MenuProduct>> {
    let product = CatalogRepository::new(state.pool()).product(id).await?;
    Ok(Json(MenuProduct::new(product, state.config().currency)))
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;

    fn category(id: i32, name: &str) -> Category {
        Category {
            id: CategoryId::new(id),
            name: name.to_string(),
            slug: name.to_lowercase(),
            sort_order: id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn product(id: i32, category: Option<i32>, cents: i64) -> Product {
        Product {
            id: ProductId::new(id),
            category_id: category.map(CategoryId::new),
            name: format!("Item {id}"),
            description: String::new(),
            price: Decimal::new(cents, 2),
            image_path: None,
            is_available: true,
            stock: None,
            sort_order: id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_groups_by_category_in_order() {
        let sections = group_menu(
            vec![category(1, "Pizze"), category(2, "Bevande"), category(3, "Dolci")],
            vec![
                product(10, Some(2), 250),
                product(11, Some(1), 850),
                product(12, Some(1), 900),
            ],
            CurrencyCode::EUR,
        );

        assert_eq!(sections.len(), 2, "empty categories are skipped");
        assert_eq!(sections[0].category.as_ref().map(|c| c.id), Some(CategoryId::new(1)));
        assert_eq!(sections[0].products.len(), 2);
        assert_eq!(sections[0].products[0].price_display, "€8.50");
        assert_eq!(sections[1].category.as_ref().map(|c| c.name.as_str()), Some("Bevande"));
    }

    #[test]
    fn test_orphans_go_last() {
        let sections = group_menu(
            vec![category(1, "Pizze")],
            vec![product(20, None, 100), product(21, Some(9), 100), product(22, Some(1), 100)],
            CurrencyCode::EUR,
        );

        assert_eq!(sections.len(), 2);
        let last = sections.last().map(|s| (s.category.is_none(), s.products.len()));
        assert_eq!(last, Some((true, 2)));
    }

    #[test]
    fn test_menu_product_flattens_fields() {
        let json = serde_json::to_value(MenuProduct::new(product(5, None, 1250), CurrencyCode::GBP))
            .unwrap_or_default();
        assert_eq!(json["id"], 5);
        assert_eq!(json["price"], "12.50");
        assert_eq!(json["price_display"], "£12.50");
    }
}
