//! Order queries and status updates.

use forno_core::{Order, OrderId, OrderItem, OrderStatus};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::instrument;

use super::RepositoryError;

const ORDER_COLUMNS: &str = "id, customer_name, customer_phone, customer_email, fulfillment, \
     address, latitude, longitude, distance_km, subtotal, delivery_fee, total, notes, status, \
     created_at, updated_at";

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

/// Filters for the order list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub limit: Option<i64>,
}

impl OrderFilter {
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// An order with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Most recent orders first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM forno.orders \
             WHERE ($1::forno.order_status IS NULL OR status = $1) \
             ORDER BY created_at DESC, id DESC LIMIT $2"
        );
        Ok(sqlx::query_as::<_, Order>(&sql)
            .bind(filter.status)
            .bind(filter.limit())
            .fetch_all(self.pool)
            .await?)
    }

    /// An order with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get(&self, id: OrderId) -> Result<OrderDetail, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM forno.orders WHERE id = $1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let items = sqlx::query_as::<_, OrderItem>(
            r"
            SELECT id, order_id, product_id, product_name, unit_price, quantity, line_total
            FROM forno.order_items
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(OrderDetail { order, items })
    }

    /// Set an order's status. Any status may follow any other.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    #[instrument(skip(self), fields(order_id = %id, status = %status))]
    pub async fn set_status(&self, id: OrderId, status: OrderStatus) -> Result<Order, RepositoryError> {
        let sql = format!(
            "UPDATE forno.orders SET status = $2 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .bind(status)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_limit_is_clamped() {
        assert_eq!(OrderFilter::default().limit(), DEFAULT_LIMIT);
        let filter: OrderFilter = serde_json::from_str(r#"{"limit": 10000}"#).unwrap();
        assert_eq!(filter.limit(), MAX_LIMIT);
        let filter: OrderFilter = serde_json::from_str(r#"{"limit": -3}"#).unwrap();
        assert_eq!(filter.limit(), 1);
    }

    #[test]
    fn test_filter_parses_status() {
        let filter: OrderFilter =
            serde_json::from_str(r#"{"status": "out_for_delivery"}"#).unwrap();
        assert_eq!(filter.status, Some(OrderStatus::OutForDelivery));
    }
}
