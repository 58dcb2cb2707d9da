//! HTTP client for the map backend.

use anyhow::{Context, Result};
use geojson::GeoJson;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use super::models::{ImportedDateRange, Resource};
use crate::state::ResourceType;

/// Path of the imported-data span endpoint
pub const DATE_RANGE_PATH: &str = "/api/data/imported-date-range";

/// Path of the listing endpoint for a resource type
pub fn catalog_path(resource_type: ResourceType) -> String {
    format!("/api/{}", resource_type.collection())
}

/// A failed backend request. Every variant carries the full URL so it can be
/// shown to the user.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Status { url, .. }
            | FetchError::Transport { url, .. }
            | FetchError::Decode { url, .. } => url,
        }
    }

    /// HTTP status code, when the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// HTTP client for the map backend.
#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Arguments
    /// * `base_url` - Origin of the backend (e.g., "http://localhost:8080")
    /// * `timeout` - Per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    /// Absolute URL for an API path
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch every resource of one type
    pub async fn fetch_catalog(&self, resource_type: ResourceType) -> Result<Vec<Resource>, FetchError> {
        self.get_json(&catalog_path(resource_type)).await
    }

    /// Fetch the span of imported trend data
    pub async fn fetch_imported_date_range(&self) -> Result<ImportedDateRange, FetchError> {
        self.get_json(DATE_RANGE_PATH).await
    }

    /// Fetch a map FeatureCollection
    pub async fn fetch_map(&self, path: &str) -> Result<GeoJson, FetchError> {
        let url = self.url_for(path);
        let value: serde_json::Value = self.get_json(path).await?;
        GeoJson::from_json_value(value).map_err(|e| FetchError::Decode {
            url,
            message: e.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = self.url_for(path);
        let mut body = self.get_bytes(&url).await?;
        simd_json::serde::from_slice(&mut body).map_err(|e| FetchError::Decode {
            url,
            message: e.to_string(),
        })
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        info!("GET {}", url);
        let transport = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            warn!("GET {} failed with status {}", url, status);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(transport)?;
        info!("GET {} -> {} bytes", url, bytes.len());
        Ok(bytes.to_vec())
    }
}
