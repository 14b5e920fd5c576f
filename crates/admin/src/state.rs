//! Application state shared across handlers.

use std::sync::Arc;

use forno_core::OrderId;
use forno_settings::SettingsStore;
use sqlx::PgPool;
use tokio::sync::broadcast;

use crate::config::AdminConfig;
use crate::storage::{StorageClient, StorageError};

/// Capacity of the new-order broadcast channel.
const ORDER_CHANNEL_CAPACITY: usize = 64;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    settings: SettingsStore,
    storage: StorageClient,
    orders: broadcast::Sender<OrderId>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage HTTP client cannot be built.
    pub fn new(
        config: AdminConfig,
        pool: PgPool,
        settings: SettingsStore,
    ) -> Result<Self, StorageError> {
        let storage = StorageClient::new(&config.storage)?;
        let (orders, _) = broadcast::channel(ORDER_CHANNEL_CAPACITY);
        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                settings,
                storage,
                orders,
            }),
        })
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the settings store.
    #[must_use]
    pub fn settings(&self) -> &SettingsStore {
        &self.inner.settings
    }

    /// Get a reference to the object storage client.
    #[must_use]
    pub fn storage(&self) -> &StorageClient {
        &self.inner.storage
    }

    /// Sender for newly created order IDs.
    #[must_use]
    pub fn order_events(&self) -> &broadcast::Sender<OrderId> {
        &self.inner.orders
    }
}
