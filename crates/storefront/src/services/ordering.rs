//! Order placement.
//!
//! 1. Validate the customer fields.
//! 2. Price every line from the database; client prices are never trusted.
//! 3. For deliveries, run the resolver and refuse unless the address is in a zone.
//! 4. Insert the order and its items in one transaction.
//! 5. Decrement tracked stock and raise staff notifications. Failures here are
//!    logged and do not undo the order.

use forno_core::order::{LineRequest, OrderError, price_order};
use forno_core::{
    DeliveryValidation, Fulfillment, NotificationKind, Order, PhoneError, PhoneNumber, ProductId,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use super::delivery::DeliveryZoneResolver;
use crate::db::{CatalogRepository, NewOrder, OrderRepository, RepositoryError};

const MAX_NAME_LENGTH: usize = 100;
const MAX_NOTES_LENGTH: usize = 500;

/// Order request body.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderRequest {
    pub customer_name: String,
    pub customer_phone: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    pub fulfillment: Fulfillment,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub items: Vec<LineRequest>,
}

/// Why an order was refused.
#[derive(Debug, thiserror::Error)]
pub enum PlaceOrderError {
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Phone(#[from] PhoneError),
    #[error(transparent)]
    Items(#[from] OrderError),
    /// The delivery address is not served. Carries the full validation.
    #[error("delivery not possible to this address")]
    Delivery(Box<DeliveryValidation>),
    #[error(transparent)]
    Database(#[from] RepositoryError),
}

/// Places orders.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    resolver: &'a DeliveryZoneResolver,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, resolver: &'a DeliveryZoneResolver) -> Self {
        Self { pool, resolver }
    }

    /// Validate, price and store an order.
    ///
    /// # Errors
    ///
    /// Returns a `PlaceOrderError` describing the first problem found.
    #[instrument(skip(self, request), fields(fulfillment = ?request.fulfillment, lines = request.items.len()))]
    pub async fn place(&self, request: PlaceOrderRequest) -> Result<Order, PlaceOrderError> {
        let customer = validate_customer(&request)?;

        let ids: Vec<ProductId> = request.items.iter().map(|l| l.product_id).collect();
        let catalog = CatalogRepository::new(self.pool).products_by_ids(&ids).await?;
        let priced = price_order(&catalog, &request.items)?;

        let mut order = NewOrder {
            customer_name: customer.name,
            customer_phone: customer.phone,
            customer_email: customer.email,
            fulfillment: request.fulfillment,
            address: None,
            coordinates: None,
            distance_km: None,
            delivery_fee: Decimal::ZERO,
            notes: customer.notes,
            priced,
        };

        if request.fulfillment == Fulfillment::Delivery {
            let address = request.address.as_deref().unwrap_or_default();
            let validation = self.resolver.resolve(address, order.priced.subtotal).await;
            if !validation.is_within_zone {
                return Err(PlaceOrderError::Delivery(Box::new(validation)));
            }
            order.address = validation.formatted_address.clone();
            order.coordinates = validation.coordinates;
            order.distance_km = validation.distance_km;
            order.delivery_fee = validation.fee.unwrap_or_default();
        }

        let repo = OrderRepository::new(self.pool);
        let created = repo.create(&order).await?;
        info!(order_id = %created.id, total = %created.total, "order placed");

        self.after_create(&repo, &created, &order).await;
        Ok(created)
    }

    /// Best-effort follow-up work once the order is stored.
    async fn after_create(&self, repo: &OrderRepository<'_>, created: &Order, order: &NewOrder) {
        for line in &order.priced.lines {
            if line.remaining_stock.is_none() {
                continue;
            }
            match repo.decrement_stock(line.product_id, line.quantity).await {
                Ok(Some(0)) => {
                    let title = format!("{} is out of stock", line.product_name);
                    if let Err(e) = repo
                        .notify(NotificationKind::OutOfStock, &title, "", Some(created.id))
                        .await
                    {
                        warn!(error = %e, product_id = %line.product_id, "failed to raise out-of-stock notification");
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, product_id = %line.product_id, "failed to decrement stock");
                }
            }
        }

        let title = format!("New order #{}", created.id);
        let body = format!(
            "{} ({}) - {} item(s), total {}",
            created.customer_name,
            match created.fulfillment {
                Fulfillment::Delivery => "delivery",
                Fulfillment::Pickup => "pickup",
            },
            order.priced.lines.iter().map(|l| l.quantity).sum::<u32>(),
            created.total
        );
        if let Err(e) = repo
            .notify(NotificationKind::NewOrder, &title, &body, Some(created.id))
            .await
        {
            warn!(error = %e, order_id = %created.id, "failed to raise new-order notification");
        }
    }
}

struct Customer {
    name: String,
    phone: PhoneNumber,
    email: Option<String>,
    notes: Option<String>,
}

fn validate_customer(request: &PlaceOrderRequest) -> Result<Customer, PlaceOrderError> {
    let name = request.customer_name.trim();
    if name.is_empty() {
        return Err(PlaceOrderError::Invalid("Name is required".into()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(PlaceOrderError::Invalid("Name is too long".into()));
    }

    let phone = PhoneNumber::parse(&request.customer_phone)?;

    let email = request
        .customer_email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(|e| {
            if e.contains('@') && !e.starts_with('@') && !e.ends_with('@') {
                Ok(e.to_string())
            } else {
                Err(PlaceOrderError::Invalid("Invalid email address".into()))
            }
        })
        .transpose()?;

    let notes = request
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);
    if notes
        .as_ref()
        .is_some_and(|n| n.chars().count() > MAX_NOTES_LENGTH)
    {
        return Err(PlaceOrderError::Invalid("Notes are too long".into()));
    }

    if request.fulfillment == Fulfillment::Delivery
        && request.address.as_deref().is_none_or(|a| a.trim().is_empty())
    {
        return Err(PlaceOrderError::Invalid(
            "An address is required for delivery".into(),
        ));
    }

    Ok(Customer {
        name: name.to_string(),
        phone,
        email,
        notes,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn request() -> PlaceOrderRequest {
        PlaceOrderRequest {
            customer_name: " Giulia ".into(),
            customer_phone: "+39 02 1234 5678".into(),
            customer_email: Some("giulia@example.it".into()),
            fulfillment: Fulfillment::Pickup,
            address: None,
            notes: Some("  ".into()),
            items: vec![LineRequest {
                product_id: ProductId::new(1),
                quantity: 1,
            }],
        }
    }

    #[test]
    fn test_valid_customer_is_normalized() {
        let customer = validate_customer(&request()).unwrap();
        assert_eq!(customer.name, "Giulia");
        assert_eq!(customer.phone.as_str(), "+390212345678");
        assert_eq!(customer.email.as_deref(), Some("giulia@example.it"));
        assert!(customer.notes.is_none());
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut req = request();
        req.customer_name = "   ".into();
        assert!(matches!(
            validate_customer(&req),
            Err(PlaceOrderError::Invalid(_))
        ));
    }

    #[test]
    fn test_bad_phone_rejected() {
        let mut req = request();
        req.customer_phone = "call me".into();
        assert!(matches!(
            validate_customer(&req),
            Err(PlaceOrderError::Phone(_))
        ));
    }

    #[test]
    fn test_bad_email_rejected() {
        let mut req = request();
        req.customer_email = Some("giulia.example.it".into());
        assert!(validate_customer(&req).is_err());
    }

    #[test]
    fn test_delivery_requires_address() {
        let mut req = request();
        req.fulfillment = Fulfillment::Delivery;
        assert!(validate_customer(&req).is_err());

        req.address = Some("Via Roma 1, Milano".into());
        assert!(validate_customer(&req).is_ok());
    }

    #[test]
    fn test_request_deserializes_from_json() {
        let req: PlaceOrderRequest = serde_json::from_str(
            r#"{
                "customer_name": "Ali",
                "customer_phone": "+44 20 7946 0000",
                "fulfillment": "delivery",
                "address": "1 High St",
                "items": [{"product_id": 3, "quantity": 2}]
            }"#,
        )
        .unwrap();
        assert_eq!(req.fulfillment, Fulfillment::Delivery);
        assert_eq!(req.items[0].product_id, ProductId::new(3));
        assert!(req.customer_email.is_none());
    }
}
