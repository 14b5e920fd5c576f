//! Storage backend abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::SettingsError;

/// A row of the settings table.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct SettingRecord {
    pub key: String,
    pub value: JsonValue,
    pub updated_at: DateTime<Utc>,
}

/// Persistent storage for settings.
///
/// [`crate::PgSettingsBackend`] is the production implementation;
/// [`crate::MemoryBackend`] backs unit tests.
#[async_trait]
pub trait SettingsBackend: Send + Sync {
    /// Fetch a single setting.
    async fn get(&self, key: &str) -> Result<Option<SettingRecord>, SettingsError>;

    /// List settings, optionally restricted to keys starting with `prefix`,
    /// ordered by key.
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<SettingRecord>, SettingsError>;

    /// Insert or replace a setting.
    async fn upsert(&self, key: &str, value: &JsonValue) -> Result<SettingRecord, SettingsError>;

    /// Delete a setting. Returns whether a row existed.
    async fn delete(&self, key: &str) -> Result<bool, SettingsError>;

    /// Settings written strictly after `since`, oldest first.
    async fn changed_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<SettingRecord>, SettingsError>;
}
