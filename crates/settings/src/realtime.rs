//! Background tasks that keep a [`SettingsStore`] in sync with the database.
//!
//! The listener is the fast path: a trigger on `forno.settings` sends
//! `pg_notify('settings_changed', '{"key": ..., "op": ...}')` on every write.
//! The poller is the safety net for notifications that are dropped while the
//! listener connection is down.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::change::ChangeKind;
use crate::error::SettingsError;
use crate::store::SettingsStore;

/// Postgres notification channel used by the settings trigger.
pub const SETTINGS_CHANNEL: &str = "settings_changed";

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// How far back the first poll looks. `updated_at` comes from the database
/// clock and is the transaction start, so it can trail this process's clock.
const STARTUP_LOOKBACK_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct NotificationPayload {
    key: String,
    op: String,
}

/// Parse a `settings_changed` payload into the changed key and change kind.
///
/// Returns `None` for payloads that are not ours.
#[must_use]
pub fn parse_notification(payload: &str) -> Option<(String, ChangeKind)> {
    let parsed: NotificationPayload = serde_json::from_str(payload).ok()?;
    let kind = match parsed.op.to_ascii_uppercase().as_str() {
        "INSERT" | "UPDATE" => ChangeKind::Updated,
        "DELETE" => ChangeKind::Deleted,
        _ => return None,
    };
    Some((parsed.key, kind))
}

/// Spawn the `LISTEN settings_changed` task.
///
/// Reconnects after a delay whenever the connection fails. Every reconnect
/// clears the whole cache since notifications may have been missed.
#[must_use]
pub fn spawn_listener(store: SettingsStore, pool: PgPool) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Err(e) = listen(&store, &pool).await {
                error!(error = %e, "settings listener failed, reconnecting");
            }
            store.invalidate_all();
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    })
}

async fn listen(store: &SettingsStore, pool: &PgPool) -> Result<(), SettingsError> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(SETTINGS_CHANNEL).await?;
    info!(channel = SETTINGS_CHANNEL, "listening for settings changes");

    loop {
        // `Ok(None)` means the connection dropped and sqlx reconnected; any
        // notifications sent in between are gone.
        let Some(notification) = listener.try_recv().await? else {
            warn!("settings listener connection lost, clearing cache");
            store.invalidate_all();
            continue;
        };

        match parse_notification(notification.payload()) {
            Some((key, kind)) => {
                debug!(key = %key, ?kind, "settings change notification");
                store.apply_remote(&key, kind).await;
            }
            None => warn!(
                payload = notification.payload(),
                "ignoring malformed settings notification"
            ),
        }
    }
}

/// Spawn the polling fallback, checking for changes every `interval`.
///
/// The first poll re-reads everything written in the last minute. Keys
/// whose cached value already matches are skipped.
#[must_use]
pub fn spawn_poller(store: SettingsStore, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut watermark = Utc::now() - chrono::Duration::seconds(STARTUP_LOOKBACK_SECS);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match store.poll_changes(watermark).await {
                Ok(next) => watermark = next,
                Err(e) => warn!(error = %e, "settings poll failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeOrigin;
    use crate::memory::MemoryBackend;
    use crate::SettingRecord;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_parse_update_and_insert() {
        assert_eq!(
            parse_notification(r#"{"key":"content.hero","op":"UPDATE"}"#),
            Some(("content.hero".to_string(), ChangeKind::Updated))
        );
        assert_eq!(
            parse_notification(r#"{"key":"content.hero","op":"insert"}"#),
            Some(("content.hero".to_string(), ChangeKind::Updated))
        );
    }

    #[test]
    fn test_parse_delete() {
        assert_eq!(
            parse_notification(r#"{"key":"delivery.config","op":"DELETE"}"#),
            Some(("delivery.config".to_string(), ChangeKind::Deleted))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_notification("content.hero"), None);
        assert_eq!(parse_notification(r#"{"key":"a","op":"TRUNCATE"}"#), None);
        assert_eq!(parse_notification(r#"{"op":"UPDATE"}"#), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_picks_up_out_of_band_writes() {
        let backend = Arc::new(MemoryBackend::new());
        let store = SettingsStore::new(backend.clone());
        let mut rx = store.subscribe();

        let handle = spawn_poller(store.clone(), Duration::from_secs(30));
        tokio::task::yield_now().await;

        backend
            .insert_raw(SettingRecord {
                key: "content.offers".into(),
                value: json!("free drinks"),
                updated_at: Utc::now() + chrono::Duration::seconds(1),
            })
            .unwrap();

        tokio::time::advance(Duration::from_secs(31)).await;
        let event = rx.recv().await.unwrap();
        assert_eq!(event.key, "content.offers");
        assert_eq!(event.origin, ChangeOrigin::Remote);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_sees_writes_stamped_behind_local_clock() {
        let backend = Arc::new(MemoryBackend::new());
        // A slow database clock, or a transaction that began before startup.
        backend
            .insert_raw(SettingRecord {
                key: "content.hero".into(),
                value: json!("late commit"),
                updated_at: Utc::now() - chrono::Duration::seconds(10),
            })
            .unwrap();
        let store = SettingsStore::new(backend.clone());
        let mut rx = store.subscribe();

        let handle = spawn_poller(store.clone(), Duration::from_secs(30));
        tokio::task::yield_now().await;

        tokio::time::advance(Duration::from_secs(31)).await;
        let event = rx.recv().await.unwrap();
        assert_eq!(event.key, "content.hero");
        assert_eq!(event.origin, ChangeOrigin::Remote);

        handle.abort();
    }
}
