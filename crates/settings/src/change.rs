//! Change events published by the settings store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Updated,
    Deleted,
}

/// Where a change was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOrigin {
    /// Written through this process's [`crate::SettingsStore`].
    Local,
    /// Seen via the realtime listener or the poller.
    Remote,
}

/// A settings change event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingChange {
    pub key: String,
    pub kind: ChangeKind,
    pub origin: ChangeOrigin,
    pub observed_at: DateTime<Utc>,
}

impl SettingChange {
    /// Create a change observed now.
    #[must_use]
    pub fn new(key: impl Into<String>, kind: ChangeKind, origin: ChangeOrigin) -> Self {
        Self {
            key: key.into(),
            kind,
            origin,
            observed_at: Utc::now(),
        }
    }
}
