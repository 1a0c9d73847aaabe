//! Remote store: best-effort mirror of a site's feature collection.
//!
//! DESIGN
//! ======
//! The endpoint is an opaque key/value store addressed as
//! `{baseUrl}/{mapId}/{siteId}`. `POST` takes a form-urlencoded body whose
//! single field is named after the site and carries the collection JSON;
//! only `200` counts as accepted. `GET` on the same path returns the last
//! collection posted for the site.
//!
//! `RemoteStore` is the seam the session and sync worker depend on, so
//! tests swap in an in-memory mock.
//!
//! ERROR HANDLING
//! ==============
//! Every failure is a typed `RemoteError`. A malformed `GET` body is a
//! `Decode` error returned to the caller, never a panic.

use reqwest::{StatusCode, Url};
use tracing::debug;

use crate::config::RemoteConfig;
use crate::feature::FeatureCollection;
use crate::site::SiteId;

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
    #[error("base URL cannot carry path segments: {0}")]
    InvalidBaseUrl(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("remote rejected request: status {status}")]
    Rejected { status: u16 },
    #[error("remote returned malformed collection: {0}")]
    Decode(String),
    #[error("feature collection encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// Replace the remote copy of the site's collection.
    async fn push(&self, site: &SiteId, collection: &FeatureCollection) -> Result<(), RemoteError>;

    /// Fetch the remote copy. `Ok(None)` when the remote has nothing.
    async fn fetch(&self, site: &SiteId) -> Result<Option<FeatureCollection>, RemoteError>;
}

// =============================================================================
// HTTP REMOTE
// =============================================================================

pub struct HttpRemote {
    http: reqwest::Client,
    base_url: Url,
    map_id: String,
}

impl HttpRemote {
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or the HTTP client
    /// cannot be built.
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| RemoteError::InvalidBaseUrl(e.to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| RemoteError::ClientBuild(e.to_string()))?;
        Ok(Self { http, base_url, map_id: config.map_id.clone() })
    }

    /// `{baseUrl}/{mapId}/{siteId}` with each segment percent-encoded.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBaseUrl` for cannot-be-a-base URLs.
    pub fn endpoint(&self, site: &SiteId) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RemoteError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(&self.map_id)
            .push(site.as_str());
        Ok(url)
    }
}

#[async_trait::async_trait]
impl RemoteStore for HttpRemote {
    async fn push(&self, site: &SiteId, collection: &FeatureCollection) -> Result<(), RemoteError> {
        let url = self.endpoint(site)?;
        let body = collection.to_json()?;

        let response = self
            .http
            .post(url)
            .form(&[(site.as_str(), body.as_str())])
            .send()
            .await?;

        let status = response.status();
        debug!(site_id = %site, status = status.as_u16(), count = collection.len(), "remote push answered");
        if status != StatusCode::OK {
            return Err(RemoteError::Rejected { status: status.as_u16() });
        }
        Ok(())
    }

    async fn fetch(&self, site: &SiteId) -> Result<Option<FeatureCollection>, RemoteError> {
        let url = self.endpoint(site)?;
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status != StatusCode::OK {
            return Err(RemoteError::Rejected { status: status.as_u16() });
        }

        let text = response.text().await?;
        parse_fetch_body(&text)
    }
}

/// Empty bodies and JSON `null` mean "nothing stored".
pub(crate) fn parse_fetch_body(text: &str) -> Result<Option<FeatureCollection>, RemoteError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    FeatureCollection::from_json(trimmed)
        .map(Some)
        .map_err(|e| RemoteError::Decode(e.to_string()))
}

#[cfg(test)]
#[path = "remote_test.rs"]
mod tests;
