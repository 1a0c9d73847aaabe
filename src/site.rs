//! Site identifier: namespaces storage keys and remote endpoint paths.

use std::fmt;

use reqwest::Url;

const SITE_QUERY_PARAM: &str = "siteid";
const COMMITTED_SUFFIX: &str = "polygon-features";
const PENDING_SUFFIX: &str = "new-polygon-features";

#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    #[error("invalid page URL: {0}")]
    InvalidUrl(String),
    #[error("page URL has no `siteid` query parameter")]
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SiteId(String);

impl SiteId {
    /// Build a site id from a raw value. Blank values are rejected.
    ///
    /// # Errors
    ///
    /// Returns `SiteError::Missing` when the value is empty or whitespace.
    pub fn new(raw: impl Into<String>) -> Result<Self, SiteError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(SiteError::Missing);
        }
        Ok(Self(raw))
    }

    /// Extract the site id from the `siteid` query parameter of a page URL.
    ///
    /// # Errors
    ///
    /// Returns `SiteError::InvalidUrl` when the URL does not parse and
    /// `SiteError::Missing` when the parameter is absent or blank.
    pub fn from_page_url(page_url: &str) -> Result<Self, SiteError> {
        let url = Url::parse(page_url).map_err(|e| SiteError::InvalidUrl(e.to_string()))?;
        let value = url
            .query_pairs()
            .find(|(key, _)| key == SITE_QUERY_PARAM)
            .map(|(_, value)| value.into_owned())
            .ok_or(SiteError::Missing)?;
        Self::new(value)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage keys for this site. Every storage call in a session goes
    /// through the keys derived here.
    #[must_use]
    pub fn storage_keys(&self) -> StorageKeys {
        StorageKeys {
            committed: format!("{}{COMMITTED_SUFFIX}", self.0),
            pending: format!("{}{PENDING_SUFFIX}", self.0),
        }
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two storage keys a site owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    /// Committed collection: `{siteId}polygon-features`.
    pub committed: String,
    /// Pending collection: `{siteId}new-polygon-features`.
    pub pending: String,
}

#[cfg(test)]
#[path = "site_test.rs"]
mod tests;
