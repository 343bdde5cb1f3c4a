//! `POST /geocode` proxy: resolves a place id to coordinates with the
//! server-side maps key so the key never reaches the browser.

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::error::SchoolMatchError;
use crate::models::LatLng;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeRequest {
    #[serde(default)]
    pub place_id: Option<String>,
}

// Geocoding API response, only the fields the proxy reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeocodeApiResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResult {
    pub geometry: Geometry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GeocodeUpstream: Send + Sync {
    async fn lookup(
        &self,
        place_id: &str,
        api_key: &str,
    ) -> Result<GeocodeApiResponse, SchoolMatchError>;
}

pub struct GoogleGeocoder {
    client: Client,
    url: String,
}

impl GoogleGeocoder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl GeocodeUpstream for GoogleGeocoder {
    async fn lookup(
        &self,
        place_id: &str,
        api_key: &str,
    ) -> Result<GeocodeApiResponse, SchoolMatchError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("place_id", place_id), ("key", api_key)])
            .send()
            .await?;
        Ok(response.json().await?)
    }
}

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Missing placeId")]
    MissingPlaceId,

    #[error("API key not configured.")]
    ApiKeyMissing,

    #[error("Geocoding failed: {0}")]
    GeocodingFailed(String),

    #[error("Internal server error.")]
    Internal,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match self {
            ProxyError::MissingPlaceId => StatusCode::BAD_REQUEST,
            ProxyError::ApiKeyMissing
            | ProxyError::GeocodingFailed(_)
            | ProxyError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Clone)]
pub struct ProxyState {
    upstream: Arc<dyn GeocodeUpstream>,
    api_key: Option<String>,
}

impl ProxyState {
    pub fn new(upstream: Arc<dyn GeocodeUpstream>, api_key: Option<String>) -> Self {
        Self { upstream, api_key }
    }
}

pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/geocode", post(geocode))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

async fn geocode(
    State(state): State<ProxyState>,
    payload: Result<Json<GeocodeRequest>, JsonRejection>,
) -> Result<Json<LatLng>, ProxyError> {
    let place_id = payload
        .ok()
        .and_then(|Json(req)| req.place_id)
        .filter(|id| !id.is_empty())
        .ok_or(ProxyError::MissingPlaceId)?;

    let api_key = state
        .api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            tracing::error!("Google Maps API key is not configured on the server.");
            ProxyError::ApiKeyMissing
        })?;

    let data = state
        .upstream
        .lookup(&place_id, api_key)
        .await
        .map_err(|e| {
            tracing::error!("Error fetching from Geocoding API: {}", e);
            ProxyError::Internal
        })?;

    if data.status != "OK" || data.results.is_empty() {
        let reason = data.error_message.unwrap_or(data.status);
        tracing::error!("Geocoding API error: {}", reason);
        return Err(ProxyError::GeocodingFailed(reason));
    }

    let location = data.results[0].geometry.location;
    tracing::info!(%place_id, lat = location.lat, lng = location.lng, "geocoded place");
    Ok(Json(location))
}
