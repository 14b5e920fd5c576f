//! Staff notifications.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use forno_core::{Notification, NotificationId};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::NotificationRepository;
use crate::error::Result;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub unread: bool,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}

/// `GET /api/notifications`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Notification>>> {
    Ok(Json(NotificationRepository::new(state.pool()).list(query.unread).await?))
}

/// `POST /api/notifications/{id}/read`
#[instrument(skip(state))]
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<NotificationId>,
) -> Result<Json<Notification>> {
    Ok(Json(NotificationRepository::new(state.pool()).mark_read(id).await?))
}

/// `POST /api/notifications/read-all`
#[instrument(skip(state))]
pub async fn mark_all_read(State(state): State<AppState>) -> Result<Json<MarkedRead>> {
    let updated = NotificationRepository::new(state.pool()).mark_all_read().await?;
    Ok(Json(MarkedRead { updated }))
}
