//! Forno Settings - the key→JSON settings store.
//!
//! Restaurant content (hero banners, offers, "about us"), delivery
//! configuration and third-party API keys all live in one `forno.settings`
//! table. This crate wraps that table with:
//!
//! - a write-through [`SettingsStore`] with an in-memory per-key cache
//!   (no TTL, no eviction - invalidated on write),
//! - publish/subscribe of [`SettingChange`] events to in-process listeners,
//! - a realtime [`spawn_listener`] on Postgres `LISTEN settings_changed`,
//! - a polling fallback ([`spawn_poller`]) for notifications lost while the
//!   listener was disconnected.
//!
//! Last writer wins. Subscribers must tolerate the same change being
//! reported more than once (a local write is also echoed back by the
//! database trigger).

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod change;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod realtime;
pub mod store;

pub use backend::{SettingRecord, SettingsBackend};
pub use change::{ChangeKind, ChangeOrigin, SettingChange};
pub use error::SettingsError;
pub use memory::MemoryBackend;
pub use postgres::PgSettingsBackend;
pub use realtime::{SETTINGS_CHANNEL, parse_notification, spawn_listener, spawn_poller};
pub use store::SettingsStore;
