//! Application state shared across handlers.

use std::sync::Arc;

use forno_settings::SettingsStore;
use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::search::SearchIndex;
use crate::services::DeliveryZoneResolver;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    settings: SettingsStore,
    search: SearchIndex,
    delivery: DeliveryZoneResolver,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        pool: PgPool,
        settings: SettingsStore,
        search: SearchIndex,
        delivery: DeliveryZoneResolver,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                settings,
                search,
                delivery,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
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

    /// Get a reference to the product search index.
    #[must_use]
    pub fn search(&self) -> &SearchIndex {
        &self.inner.search
    }

    /// Get a reference to the delivery zone resolver.
    #[must_use]
    pub fn delivery(&self) -> &DeliveryZoneResolver {
        &self.inner.delivery
    }
}
