//! In-process settings backend for tests and local tooling.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use crate::backend::{SettingRecord, SettingsBackend};
use crate::error::SettingsError;

/// A `BTreeMap` behind a mutex, ordered by key like the Postgres backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: Mutex<BTreeMap<String, SettingRecord>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record with an explicit timestamp, bypassing `upsert`.
    ///
    /// Used to simulate writes made by another process.
    pub fn insert_raw(&self, record: SettingRecord) -> Result<(), SettingsError> {
        self.lock()?.insert(record.key.clone(), record);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, SettingRecord>>, SettingsError> {
        self.records
            .lock()
            .map_err(|_| SettingsError::Backend("memory backend lock poisoned".to_string()))
    }
}

#[async_trait]
impl SettingsBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<SettingRecord>, SettingsError> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<SettingRecord>, SettingsError> {
        let records = self.lock()?;
        Ok(records
            .values()
            .filter(|r| prefix.is_none_or(|p| r.key.starts_with(p)))
            .cloned()
            .collect())
    }

    async fn upsert(&self, key: &str, value: &JsonValue) -> Result<SettingRecord, SettingsError> {
        let record = SettingRecord {
            key: key.to_string(),
            value: value.clone(),
            updated_at: Utc::now(),
        };
        self.lock()?.insert(key.to_string(), record.clone());
        Ok(record)
    }

    async fn delete(&self, key: &str) -> Result<bool, SettingsError> {
        Ok(self.lock()?.remove(key).is_some())
    }

    async fn changed_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<SettingRecord>, SettingsError> {
        let mut changed: Vec<SettingRecord> = self
            .lock()?
            .values()
            .filter(|r| r.updated_at > since)
            .cloned()
            .collect();
        changed.sort_by_key(|r| r.updated_at);
        Ok(changed)
    }
}
