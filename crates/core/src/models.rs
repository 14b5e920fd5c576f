//! Database records shared by the storefront and the admin.
//!
//! With the `postgres` feature every record derives `sqlx::FromRow`, so the
//! binaries can `query_as` straight into them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{
    CategoryId, Fulfillment, NotificationId, OrderId, OrderItemId, OrderStatus, ProductId,
};

/// A menu section ("Pizze rosse", "Wraps", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A menu item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Product {
    pub id: ProductId,
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    /// Object storage path of the product photo.
    pub image_path: Option<String>,
    pub is_available: bool,
    /// Units left. `None` means stock is not tracked.
    pub stock: Option<i32>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether `quantity` units can be sold right now.
    #[must_use]
    pub fn can_supply(&self, quantity: u32) -> bool {
        self.is_available
            && self
                .stock
                .is_none_or(|stock| i64::from(stock) >= i64::from(quantity))
    }
}

/// A customer order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Order {
    pub id: OrderId,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub fulfillment: Fulfillment,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub distance_km: Option<f64>,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
    pub notes: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line of an order, with the name and price frozen at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// A staff notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Notification {
    pub id: NotificationId,
    /// See [`crate::types::NotificationKind::as_str`].
    pub kind: String,
    pub title: String,
    pub body: String,
    pub order_id: Option<OrderId>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: Option<i32>, is_available: bool) -> Product {
        Product {
            id: ProductId::new(1),
            category_id: None,
            name: "Margherita".into(),
            description: String::new(),
            price: Decimal::new(850, 2),
            image_path: None,
            is_available,
            stock,
            sort_order: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_untracked_stock_always_supplies() {
        assert!(product(None, true).can_supply(1_000));
    }

    #[test]
    fn test_tracked_stock_limits_quantity() {
        let p = product(Some(3), true);
        assert!(p.can_supply(3));
        assert!(!p.can_supply(4));
    }

    #[test]
    fn test_unavailable_never_supplies() {
        assert!(!product(None, false).can_supply(1));
    }
}
