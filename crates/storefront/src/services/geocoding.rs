//! Geocoding client.
//!
//! Talks to the Google Geocoding JSON API (`GET {base}?address=..&key=..`).
//! The API key lives in the `geocoding.api_key` setting and is looked up on
//! every call, so rotating it takes effect without a restart. Calls are not
//! retried and results are not cached. A request that takes longer than
//! [`REQUEST_TIMEOUT`] fails, so a stalled geocoder cannot hold an order open.

use std::time::Duration;

use async_trait::async_trait;
use forno_core::delivery::GeocodedAddress;
use forno_core::{Coordinates, keys};
use forno_settings::{SettingsError, SettingsStore};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

/// Upper bound for one geocoding request, connect included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the geocoding service.
#[derive(Debug, thiserror::Error)]
pub enum GeocodingError {
    #[error("geocoding API key is not configured")]
    MissingApiKey,
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("geocoder returned status {status}: {message}")]
    Status { status: String, message: String },
    #[error("invalid geocoder response: {0}")]
    InvalidResponse(String),
}

/// Resolves free-text addresses to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Geocode `address`.
    ///
    /// Returns `Ok(None)` when the service has no match for the address.
    async fn geocode(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodingError>;
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

/// Google Geocoding API client.
#[derive(Clone)]
pub struct GoogleGeocoder {
    client: Client,
    base_url: String,
    settings: SettingsStore,
}

impl std::fmt::Debug for GoogleGeocoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleGeocoder")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GoogleGeocoder {
    /// Create a client for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, settings: SettingsStore) -> Result<Self, GeocodingError> {
        Self::with_timeout(base_url, settings, REQUEST_TIMEOUT)
    }

    fn with_timeout(
        base_url: impl Into<String>,
        settings: SettingsStore,
        timeout: Duration,
    ) -> Result<Self, GeocodingError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            settings,
        })
    }

    async fn api_key(&self) -> Result<String, GeocodingError> {
        self.settings
            .get_typed::<String>(keys::GEOCODING_API_KEY)
            .await?
            .filter(|key| !key.trim().is_empty())
            .ok_or(GeocodingError::MissingApiKey)
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    #[instrument(skip(self))]
    async fn geocode(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodingError> {
        let api_key = self.api_key().await?;

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("address", address), ("key", api_key.as_str())])
            .send()
            .await?
            .error_for_status()?;

        let body: GeocodeResponse = response.json().await?;
        debug!(status = %body.status, results = body.results.len(), "geocoder response");

        match body.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Ok(None),
            _ => {
                warn!(status = %body.status, "geocoding failed");
                return Err(GeocodingError::Status {
                    message: body.error_message.unwrap_or_default(),
                    status: body.status,
                });
            }
        }

        let Some(first) = body.results.into_iter().next() else {
            return Ok(None);
        };

        let coordinates = Coordinates::new(first.geometry.location.lat, first.geometry.location.lng)
            .map_err(|e| GeocodingError::InvalidResponse(e.to_string()))?;

        Ok(Some(GeocodedAddress {
            formatted_address: first.formatted_address,
            coordinates,
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use forno_settings::MemoryBackend;
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    async fn settings_with_key() -> SettingsStore {
        let store = SettingsStore::new(Arc::new(MemoryBackend::new()));
        store
            .set(keys::GEOCODING_API_KEY, json!("AIzaTestKey"))
            .await
            .unwrap();
        store
    }

    async fn geocoder_for(server: &MockServer) -> GoogleGeocoder {
        GoogleGeocoder::new(server.url("/geocode/json"), settings_with_key().await).unwrap()
    }

    #[tokio::test]
    async fn test_geocode_ok() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/geocode/json")
                    .query_param("address", "Via Roma 1, Milano")
                    .query_param("key", "AIzaTestKey");
                then.status(200).json_body(json!({
                    "status": "OK",
                    "results": [{
                        "formatted_address": "Via Roma, 1, 20121 Milano MI, Italy",
                        "geometry": { "location": { "lat": 45.4668, "lng": 9.1905 } }
                    }]
                }));
            })
            .await;

        let geocoder = geocoder_for(&server).await;
        let result = geocoder.geocode("Via Roma 1, Milano").await.unwrap().unwrap();

        mock.assert_async().await;
        assert_eq!(result.formatted_address, "Via Roma, 1, 20121 Milano MI, Italy");
        assert!((result.coordinates.lat - 45.4668).abs() < 1e-9);
        assert!((result.coordinates.lng - 9.1905).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_geocode_zero_results_is_none() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/geocode/json");
                then.status(200)
                    .json_body(json!({ "status": "ZERO_RESULTS", "results": [] }));
            })
            .await;

        let geocoder = geocoder_for(&server).await;
        assert!(geocoder.geocode("nowhere at all").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_geocode_denied_is_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/geocode/json");
                then.status(200).json_body(json!({
                    "status": "REQUEST_DENIED",
                    "results": [],
                    "error_message": "The provided API key is invalid."
                }));
            })
            .await;

        let geocoder = geocoder_for(&server).await;
        let err = geocoder.geocode("Via Roma 1").await.unwrap_err();
        assert!(matches!(err, GeocodingError::Status { ref status, .. } if status == "REQUEST_DENIED"));
    }

    #[tokio::test]
    async fn test_geocode_http_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/geocode/json");
                then.status(503);
            })
            .await;

        let geocoder = geocoder_for(&server).await;
        assert!(matches!(
            geocoder.geocode("Via Roma 1").await,
            Err(GeocodingError::Http(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_api_key_skips_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/geocode/json");
                then.status(200).json_body(json!({ "status": "OK", "results": [] }));
            })
            .await;

        let settings = SettingsStore::new(Arc::new(MemoryBackend::new()));
        let geocoder = GoogleGeocoder::new(server.url("/geocode/json"), settings).unwrap();

        assert!(matches!(
            geocoder.geocode("Via Roma 1").await,
            Err(GeocodingError::MissingApiKey)
        ));
        mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_stalled_geocoder_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/geocode/json");
                then.status(200)
                    .json_body(json!({ "status": "ZERO_RESULTS", "results": [] }))
                    .delay(Duration::from_secs(5));
            })
            .await;

        let geocoder = GoogleGeocoder::with_timeout(
            server.url("/geocode/json"),
            settings_with_key().await,
            Duration::from_millis(100),
        )
        .unwrap();
        let err = geocoder.geocode("Via Roma 1").await.unwrap_err();
        assert!(matches!(&err, GeocodingError::Http(e) if e.is_timeout()), "{err}");
    }
}
