//! Live feed of newly placed orders.
//!
//! An `AFTER INSERT` trigger on `forno.orders` sends
//! `pg_notify('order_created', id::text)`. This task relays those IDs to the
//! in-process broadcast channel the SSE endpoint subscribes to.

use std::time::Duration;

use forno_core::OrderId;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Postgres notification channel used by the order trigger.
pub const ORDER_CHANNEL: &str = "order_created";

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Parse an `order_created` payload.
#[must_use]
pub fn parse_order_id(payload: &str) -> Option<OrderId> {
    payload.trim().parse().ok()
}

/// Spawn the `LISTEN order_created` task. Reconnects after a delay whenever
/// the connection fails.
#[must_use]
pub fn spawn_order_listener(pool: PgPool, sender: broadcast::Sender<OrderId>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Err(e) = listen(&pool, &sender).await {
                error!(error = %e, "order listener failed, reconnecting");
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    })
}

async fn listen(pool: &PgPool, sender: &broadcast::Sender<OrderId>) -> Result<(), sqlx::Error> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(ORDER_CHANNEL).await?;
    info!(channel = ORDER_CHANNEL, "listening for new orders");

    loop {
        let Some(notification) = listener.try_recv().await? else {
            warn!("order listener connection lost, new orders may have been missed");
            continue;
        };

        match parse_order_id(notification.payload()) {
            Some(id) => {
                debug!(order_id = %id, "new order notification");
                // No subscribers is fine: nobody has the dashboard open.
                let _ = sender.send(id);
            }
            None => warn!(
                payload = notification.payload(),
                "ignoring malformed order notification"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_order_id() {
        assert_eq!(parse_order_id("42"), Some(OrderId::new(42)));
        assert_eq!(parse_order_id(" 7\n"), Some(OrderId::new(7)));
        assert_eq!(parse_order_id("order-7"), None);
        assert_eq!(parse_order_id(""), None);
    }
}
