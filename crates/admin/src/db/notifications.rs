//! Staff notifications.

use forno_core::{Notification, NotificationId};
use sqlx::PgPool;
use tracing::instrument;

use super::RepositoryError;

const NOTIFICATION_COLUMNS: &str = "id, kind, title, body, order_id, is_read, created_at";
const LIST_LIMIT: i64 = 100;

/// Repository for notification database operations.
pub struct NotificationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationRepository<'a> {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Newest notifications first, optionally only unread ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, unread_only: bool) -> Result<Vec<Notification>, RepositoryError> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM forno.notifications \
             WHERE NOT ($1 AND is_read) \
             ORDER BY created_at DESC, id DESC LIMIT $2"
        );
        Ok(sqlx::query_as::<_, Notification>(&sql)
            .bind(unread_only)
            .bind(LIST_LIMIT)
            .fetch_all(self.pool)
            .await?)
    }

    /// Mark one notification as read.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the notification does not exist.
    #[instrument(skip(self), fields(notification_id = %id))]
    pub async fn mark_read(&self, id: NotificationId) -> Result<Notification, RepositoryError> {
        let sql = format!(
            "UPDATE forno.notifications SET is_read = TRUE WHERE id = $1 \
             RETURNING {NOTIFICATION_COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Mark everything read. Returns how many rows changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    #[instrument(skip(self))]
    pub async fn mark_all_read(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("UPDATE forno.notifications SET is_read = TRUE WHERE NOT is_read")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
