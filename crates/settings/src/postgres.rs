//! Postgres-backed settings repository.
//!
//! # Table: `forno.settings`
//!
//! | column       | type          |
//! |--------------|---------------|
//! | `key`        | `TEXT` PK     |
//! | `value`      | `JSONB`       |
//! | `updated_at` | `TIMESTAMPTZ` |
//!
//! A trigger on the table sends `pg_notify('settings_changed', ...)` for every
//! insert, update and delete; see [`crate::realtime`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use tracing::instrument;

use crate::backend::{SettingRecord, SettingsBackend};
use crate::error::SettingsError;

/// Settings repository over a `PgPool`.
#[derive(Clone)]
pub struct PgSettingsBackend {
    pool: PgPool,
}

impl PgSettingsBackend {
    /// Create a new backend.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Escape `LIKE` metacharacters so a prefix matches literally.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl SettingsBackend for PgSettingsBackend {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<SettingRecord>, SettingsError> {
        let record = sqlx::query_as::<_, SettingRecord>(
            r"
            SELECT key, value, updated_at
            FROM forno.settings
            WHERE key = $1
            ",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    #[instrument(skip(self))]
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<SettingRecord>, SettingsError> {
        let records = match prefix {
            Some(prefix) => {
                sqlx::query_as::<_, SettingRecord>(
                    r"
                    SELECT key, value, updated_at
                    FROM forno.settings
                    WHERE key LIKE $1
                    ORDER BY key
                    ",
                )
                .bind(like_prefix(prefix))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, SettingRecord>(
                    r"
                    SELECT key, value, updated_at
                    FROM forno.settings
                    ORDER BY key
                    ",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(records)
    }

    #[instrument(skip(self, value))]
    async fn upsert(&self, key: &str, value: &JsonValue) -> Result<SettingRecord, SettingsError> {
        let record = sqlx::query_as::<_, SettingRecord>(
            r"
            INSERT INTO forno.settings (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            RETURNING key, value, updated_at
            ",
        )
        .bind(key)
        .bind(value)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<bool, SettingsError> {
        let result = sqlx::query("DELETE FROM forno.settings WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn changed_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<SettingRecord>, SettingsError> {
        let records = sqlx::query_as::<_, SettingRecord>(
            r"
            SELECT key, value, updated_at
            FROM forno.settings
            WHERE updated_at > $1
            ORDER BY updated_at
            ",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_prefix_escapes_wildcards() {
        assert_eq!(like_prefix("content."), "content.%");
        assert_eq!(like_prefix("100%_off"), "100\\%\\_off%");
    }
}
