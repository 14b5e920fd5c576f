//! Server-side order pricing.
//!
//! Clients send product IDs and quantities only. Names and unit prices are
//! taken from the catalog as it is when the order is placed.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Product;
use crate::types::ProductId;
use crate::types::price::round_cents;

/// Maximum number of distinct lines in one order.
pub const MAX_LINES: usize = 50;

/// Maximum units of one product in an order, after merging duplicate lines.
pub const MAX_QUANTITY: u32 = 99;

/// One line of an order request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A line priced from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
    /// Units left after this order, for tracked products.
    pub remaining_stock: Option<i32>,
}

/// All lines priced, before delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricedOrder {
    pub lines: Vec<PricedLine>,
    pub subtotal: Decimal,
}

impl PricedOrder {
    /// Subtotal plus `delivery_fee`.
    #[must_use]
    pub fn total_with(&self, delivery_fee: Decimal) -> Decimal {
        round_cents(self.subtotal + delivery_fee)
    }
}

/// Reasons an order cannot be priced.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("order has no items")]
    Empty,
    #[error("order has too many lines (max {MAX_LINES})")]
    TooManyLines,
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("quantity must be at most {MAX_QUANTITY}")]
    QuantityTooLarge,
    #[error("product {0} does not exist")]
    UnknownProduct(ProductId),
    #[error("{0} is not available")]
    Unavailable(String),
    #[error("only {available} of {name} left")]
    InsufficientStock { name: String, available: i32 },
}

/// Price `lines` against `catalog`.
///
/// Lines for the same product are merged, keeping the position of the first.
///
/// # Errors
///
/// Returns the first problem found: an empty order, a zero or oversized
/// quantity, an unknown or unavailable product, or not enough stock.
pub fn price_order(catalog: &[Product], lines: &[LineRequest]) -> Result<PricedOrder, OrderError> {
    if lines.is_empty() {
        return Err(OrderError::Empty);
    }
    if lines.len() > MAX_LINES {
        return Err(OrderError::TooManyLines);
    }

    let mut merged: Vec<LineRequest> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity == 0 {
            return Err(OrderError::ZeroQuantity);
        }
        let quantity = match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(line.quantity);
                existing.quantity
            }
            None => {
                merged.push(*line);
                line.quantity
            }
        };
        if quantity > MAX_QUANTITY {
            return Err(OrderError::QuantityTooLarge);
        }
    }

    let by_id: HashMap<ProductId, &Product> = catalog.iter().map(|p| (p.id, p)).collect();
    let mut priced = Vec::with_capacity(merged.len());
    let mut subtotal = Decimal::ZERO;

    for line in merged {
        let product = by_id
            .get(&line.product_id)
            .ok_or(OrderError::UnknownProduct(line.product_id))?;

        if !product.is_available {
            return Err(OrderError::Unavailable(product.name.clone()));
        }
        if !product.can_supply(line.quantity) {
            return Err(OrderError::InsufficientStock {
                name: product.name.clone(),
                available: product.stock.unwrap_or_default(),
            });
        }

        let quantity =
            i32::try_from(line.quantity).map_err(|_| OrderError::QuantityTooLarge)?;
        let line_total = round_cents(product.price * Decimal::from(line.quantity));
        subtotal += line_total;
        priced.push(PricedLine {
            product_id: product.id,
            product_name: product.name.clone(),
            unit_price: product.price,
            quantity: line.quantity,
            line_total,
            remaining_stock: product.stock.map(|stock| stock - quantity),
        });
    }

    Ok(PricedOrder {
        lines: priced,
        subtotal: round_cents(subtotal),
    })
}
