//! Order writes.

use forno_core::order::PricedOrder;
use forno_core::{
    Coordinates, Fulfillment, NotificationKind, Order, OrderId, OrderStatus, PhoneNumber,
    ProductId,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use super::{RepositoryError, quantity_param};

const ORDER_COLUMNS: &str = "id, customer_name, customer_phone, customer_email, fulfillment, \
     address, latitude, longitude, distance_km, subtotal, delivery_fee, total, notes, status, \
     created_at, updated_at";

/// A validated, priced order ready to be stored.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_name: String,
    pub customer_phone: PhoneNumber,
    pub customer_email: Option<String>,
    pub fulfillment: Fulfillment,
    /// Geocoder-normalized address for deliveries.
    pub address: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub distance_km: Option<f64>,
    pub delivery_fee: Decimal,
    pub notes: Option<String>,
    pub priced: PricedOrder,
}

/// Order persistence for the storefront.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert the order and its items in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails; nothing is stored in that case.
    #[instrument(skip(self, order), fields(lines = order.priced.lines.len()))]
    pub async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO forno.orders (customer_name, customer_phone, customer_email, \
             fulfillment, address, latitude, longitude, distance_km, subtotal, delivery_fee, \
             total, notes, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {ORDER_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Order>(&sql)
            .bind(&order.customer_name)
            .bind(order.customer_phone.as_str())
            .bind(order.customer_email.as_deref())
            .bind(order.fulfillment)
            .bind(order.address.as_deref())
            .bind(order.coordinates.map(|c| c.lat))
            .bind(order.coordinates.map(|c| c.lng))
            .bind(order.distance_km)
            .bind(order.priced.subtotal)
            .bind(order.delivery_fee)
            .bind(order.priced.total_with(order.delivery_fee))
            .bind(order.notes.as_deref())
            .bind(OrderStatus::Pending)
            .fetch_one(&mut *tx)
            .await?;

        for line in &order.priced.lines {
            sqlx::query(
                r"
                INSERT INTO forno.order_items
                    (order_id, product_id, product_name, unit_price, quantity, line_total)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(created.id)
            .bind(line.product_id)
            .bind(&line.product_name)
            .bind(line.unit_price)
            .bind(quantity_param(line.quantity)?)
            .bind(line.line_total)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    /// Take `quantity` units off a tracked product and return what is left.
    ///
    /// Returns `None` for untracked products. Stock never goes below zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    #[instrument(skip(self))]
    pub async fn decrement_stock(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<i32>, RepositoryError> {
        let remaining = sqlx::query_scalar::<_, i32>(
            r"
            UPDATE forno.products
            SET stock = GREATEST(stock - $2, 0)
            WHERE id = $1 AND stock IS NOT NULL
            RETURNING stock
            ",
        )
        .bind(product_id)
        .bind(quantity_param(quantity)?)
        .fetch_optional(self.pool)
        .await?;

        Ok(remaining)
    }

    /// Raise a staff notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    #[instrument(skip(self, body))]
    pub async fn notify(
        &self,
        kind: NotificationKind,
        title: &str,
        body: &str,
        order_id: Option<OrderId>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO forno.notifications (kind, title, body, order_id)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(kind.as_str())
        .bind(title)
        .bind(body)
        .bind(order_id)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
