//! Cached, observable settings store.
//!
//! Reads go through a moka cache that also remembers missing keys. Writes hit
//! the backend first, then drop the cached entry, then publish a
//! [`SettingChange`] on a broadcast channel. Remote changes arrive through
//! [`SettingsStore::apply_remote`] and [`SettingsStore::poll_changes`].
//!
//! Every invalidation bumps a generation counter. A read only caches what it
//! fetched if no invalidation happened while it was talking to the backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::sync::broadcast;
use tracing::{debug, instrument};

use crate::backend::{SettingRecord, SettingsBackend};
use crate::change::{ChangeKind, ChangeOrigin, SettingChange};
use crate::error::SettingsError;

const EVENT_CAPACITY: usize = 256;

/// Shared settings store. Cheap to clone.
#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    backend: Arc<dyn SettingsBackend>,
    cache: Cache<String, Option<JsonValue>>,
    events: broadcast::Sender<SettingChange>,
    generation: AtomicU64,
}

impl StoreInner {
    async fn invalidate(&self, key: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate(key).await;
    }
}

impl SettingsStore {
    /// Create a store over the given backend.
    #[must_use]
    pub fn new(backend: Arc<dyn SettingsBackend>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(StoreInner {
                backend,
                cache: Cache::builder().build(),
                events,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Raw JSON value for `key`, or `None` if it is not set.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails. Failed reads are not cached.
    pub async fn get(&self, key: &str) -> Result<Option<JsonValue>, SettingsError> {
        if let Some(cached) = self.inner.cache.get(key).await {
            return Ok(cached);
        }

        let generation = self.inner.generation.load(Ordering::SeqCst);
        let value = self.inner.backend.get(key).await?.map(|r| r.value);
        if self.inner.generation.load(Ordering::SeqCst) != generation {
            return Ok(value);
        }

        self.inner
            .cache
            .insert(key.to_string(), value.clone())
            .await;
        // A write may have landed between the check and the insert.
        if self.inner.generation.load(Ordering::SeqCst) != generation {
            self.inner.cache.invalidate(key).await;
        }
        Ok(value)
    }

    /// Value for `key` deserialized into `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the stored JSON does not match `T`.
    pub async fn get_typed<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, SettingsError> {
        match self.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Full records under an optional prefix. Always reads the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub async fn list(&self, prefix: Option<&str>) -> Result<Vec<SettingRecord>, SettingsError> {
        self.inner.backend.list(prefix).await
    }

    /// Full record for `key`, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub async fn record(&self, key: &str) -> Result<Option<SettingRecord>, SettingsError> {
        self.inner.backend.get(key).await
    }

    /// Create or replace `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails; nothing is published then.
    #[instrument(skip(self, value))]
    pub async fn set(&self, key: &str, value: JsonValue) -> Result<SettingRecord, SettingsError> {
        let record = self.inner.backend.upsert(key, &value).await?;
        self.inner.invalidate(key).await;
        self.publish(key, ChangeKind::Updated, ChangeOrigin::Local);
        Ok(record)
    }

    /// Serialize `value` and store it under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the backend write fails.
    pub async fn set_typed<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<SettingRecord, SettingsError> {
        self.set(key, serde_json::to_value(value)?).await
    }

    /// Remove `key`. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<bool, SettingsError> {
        let existed = self.inner.backend.delete(key).await?;
        self.inner.invalidate(key).await;
        if existed {
            self.publish(key, ChangeKind::Deleted, ChangeOrigin::Local);
        }
        Ok(existed)
    }

    /// Subscribe to change events. Slow receivers may observe `Lagged`.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SettingChange> {
        self.inner.events.subscribe()
    }

    /// Drop the cached entry for `key`.
    pub async fn invalidate(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    /// Drop every cached entry.
    pub fn invalidate_all(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.cache.invalidate_all();
    }

    /// Handle a change made by another process.
    pub async fn apply_remote(&self, key: &str, kind: ChangeKind) {
        self.inner.invalidate(key).await;
        self.publish(key, kind, ChangeOrigin::Remote);
    }

    /// Apply every record changed after `since` and return the new watermark.
    ///
    /// Records whose cached value already matches are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails; the watermark is unchanged.
    pub async fn poll_changes(
        &self,
        since: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, SettingsError> {
        let changed = self.inner.backend.changed_since(since).await?;
        let mut watermark = since;

        for record in changed {
            watermark = watermark.max(record.updated_at);
            let cached = self.inner.cache.get(&record.key).await;
            if cached.is_some_and(|v| v.as_ref() == Some(&record.value)) {
                continue;
            }
            debug!(key = %record.key, "setting changed since last poll");
            self.apply_remote(&record.key, ChangeKind::Updated).await;
        }

        Ok(watermark)
    }

    fn publish(&self, key: &str, kind: ChangeKind, origin: ChangeOrigin) {
        // No receivers is fine.
        let _ = self.inner.events.send(SettingChange::new(key, kind, origin));
    }
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore")
            .field("cached_entries", &self.inner.cache.entry_count())
            .field("subscribers", &self.inner.events.receiver_count())
            .finish_non_exhaustive()
    }
}
