//! Public content settings and their change stream.
//!
//! Only `content.*` and `branding.*` keys are served; every other key
//! (API keys, delivery config) answers 404 as if it did not exist.

use std::convert::Infallible;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use comrak::{Options, markdown_to_html};
use forno_core::keys;
use forno_settings::SettingChange;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, instrument, warn};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Optional rendering for content values.
#[derive(Debug, Default, Deserialize)]
pub struct ContentQuery {
    /// `html` renders string values as markdown.
    pub format: Option<String>,
}

/// Response body for `GET /api/content/{key}`.
#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub key: String,
    pub value: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

/// Render markdown to HTML with the GFM extensions staff are likely to use.
/// Raw HTML in the source is dropped and replaced with an
/// `<!-- raw HTML omitted -->` comment.
pub(crate) fn render_markdown(content: &str) -> String {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    markdown_to_html(content, &options)
}

/// `GET /api/content/{key}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<ContentQuery>,
) -> Result<Json<ContentResponse>> {
    if !keys::is_public(&key) {
        return Err(AppError::NotFound(key));
    }

    let Some(value) = state.settings().get(&key).await? else {
        return Err(AppError::NotFound(key));
    };

    let html = match query.format.as_deref() {
        Some("html") => value.as_str().map(render_markdown),
        Some("json") | None => None,
        Some(other) => return Err(AppError::BadRequest(format!("unknown format: {other}"))),
    };

    Ok(Json(ContentResponse { key, value, html }))
}

/// SSE event for a change, or `None` if the key is not public.
fn change_event(change: &SettingChange) -> Option<Event> {
    if !keys::is_public(&change.key) {
        return None;
    }
    Event::default().event("setting").json_data(change).ok()
}

/// `GET /api/content/events`
///
/// Streams an event per change to a public key so open pages can refetch.
/// Slow clients skip what they missed.
pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let mut changes = state.settings().subscribe();

    let stream = async_stream::stream! {
        loop {
            match changes.recv().await {
                Ok(change) => {
                    if let Some(event) = change_event(&change) {
                        yield Ok(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Content event subscriber lagged");
                }
                Err(RecvError::Closed) => {
                    debug!("Settings change channel closed");
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
