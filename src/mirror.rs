//! HTTP access to the catalog mirrors.
//!
//! This module provides:
//!
//! - `MirrorFetcher`: The seam the loader fetches through (real HTTP or a test double)
//! - `HttpFetcher`: reqwest-backed implementation with a user agent and timeout
//! - `MirrorMeta`: Freshness/provenance descriptor published next to the catalog
//! - `MirrorUrls`: Primary and CDN endpoints for both the catalog and its meta
//!
//! Every non-2xx response is an error, so callers can treat "unavailable" and
//! "unreachable" the same way when deciding to fall back.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_data::mirror_config;

/// User agent for mirror requests
const USER_AGENT: &str = concat!("detectable-catalog/", env!("CARGO_PKG_VERSION"));

/// Errors from a single mirror request
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Freshness descriptor for the remote catalog.
///
/// Purely informational: never used to decide which list is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorMeta {
    pub last_updated: String,
    #[serde(default)]
    pub etag: Option<String>,
    pub source_url: String,
    pub sha256: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_count: Option<u64>,
}

impl MirrorMeta {
    /// Parse `last_updated` as an RFC 3339 timestamp
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.last_updated)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Whole hours since the last mirror update
    pub fn age_hours(&self, now: DateTime<Utc>) -> Option<i64> {
        self.updated_at().map(|t| (now - t).num_hours().max(0))
    }

    /// One-line description used in the activity log
    pub fn summary(&self) -> String {
        format!("Mirror: {} | Updated: {}", self.status, self.last_updated)
    }
}

/// Catalog and meta endpoints, each with a CDN fallback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorUrls {
    pub catalog_primary: String,
    pub catalog_fallback: String,
    pub meta_primary: String,
    pub meta_fallback: String,
}

impl Default for MirrorUrls {
    fn default() -> Self {
        let config = mirror_config();
        Self {
            catalog_primary: config.catalog.primary.clone(),
            catalog_fallback: config.catalog.fallback.clone(),
            meta_primary: config.meta.primary.clone(),
            meta_fallback: config.meta.fallback.clone(),
        }
    }
}

/// Something that can GET a URL and hand back the body of a successful response
pub trait MirrorFetcher: Clone + Send + Sync + 'static {
    fn fetch_bytes(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// GET `url` and decode the body as JSON
pub async fn fetch_json<F, T>(fetcher: &F, url: &str) -> Result<T, FetchError>
where
    F: MirrorFetcher,
    T: DeserializeOwned,
{
    let bytes = fetcher.fetch_bytes(url).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// reqwest-backed fetcher
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with the given per-request timeout
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, timeout })
    }

    fn request_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Transport(e)
        }
    }
}

impl MirrorFetcher for HttpFetcher {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let start = std::time::Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            tracing::debug!("GET {} -> {}", url, status);
            return Err(FetchError::Status(status));
        }

        let body = response.bytes().await.map_err(|e| self.request_error(e))?;
        tracing::debug!(
            "GET {} -> {} bytes in {:.1}s",
            url,
            body.len(),
            start.elapsed().as_secs_f32()
        );
        Ok(body.to_vec())
    }
}
