//! Pixabay image search client
//!
//! Searches for horizontally oriented, safe-search photos above a minimum
//! resolution and downloads the `largeImageURL` of a hit.

use async_trait::async_trait;
use kweb_common::config::ImageSearchConfig;
use serde::Deserialize;
use std::time::Duration;

use super::image_resolver::{ImageHit, ImageSearch, ImageSearchError};

const USER_AGENT: &str = concat!("kweb-server/", env!("CARGO_PKG_VERSION"));

/// Spaces in the search term are replaced with this token
pub const QUERY_JOIN_TOKEN: &str = "+";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<ImageHit>,
}

/// Pixabay API client
pub struct PixabayClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    per_page: u32,
    min_width: u32,
    min_height: u32,
}

impl PixabayClient {
    pub fn from_config(config: &ImageSearchConfig) -> Result<Self, ImageSearchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ImageSearchError::Network(e.to_string()))?;

        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty());

        if api_key.is_none() {
            tracing::warn!("Image search API key not configured; only cached images will be served");
        }

        Ok(Self {
            http_client,
            endpoint: config.endpoint.clone(),
            api_key,
            per_page: config.per_page,
            min_width: config.min_width,
            min_height: config.min_height,
        })
    }

    /// Query parameters for a search term (API key excluded)
    pub fn search_params(&self, query: &str) -> Vec<(&'static str, String)> {
        vec![
            ("q", query.replace(' ', QUERY_JOIN_TOKEN)),
            ("image_type", "photo".to_string()),
            ("orientation", "horizontal".to_string()),
            ("per_page", self.per_page.to_string()),
            ("safesearch", "true".to_string()),
            ("min_width", self.min_width.to_string()),
            ("min_height", self.min_height.to_string()),
        ]
    }
}

#[async_trait]
impl ImageSearch for PixabayClient {
    async fn search(&self, query: &str) -> Result<Vec<ImageHit>, ImageSearchError> {
        let api_key = self.api_key.as_deref().ok_or(ImageSearchError::NotConfigured)?;

        let mut params = vec![("key", api_key.to_string())];
        params.extend(self.search_params(query));

        tracing::debug!(query = %query, "Searching image service");

        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageSearchError::Status(status.as_u16()));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ImageSearchError::Parse(e.to_string()))?;

        tracing::debug!(query = %query, hits = body.hits.len(), "Image search complete");
        Ok(body.hits)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ImageSearchError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageSearchError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(map_request_error)?;
        Ok(bytes.to_vec())
    }
}

fn map_request_error(e: reqwest::Error) -> ImageSearchError {
    if e.is_timeout() {
        ImageSearchError::Timeout
    } else {
        ImageSearchError::Network(e.to_string())
    }
}
