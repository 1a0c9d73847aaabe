//! Shared state for the development remote endpoint.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the last collection posted per `(map_id, site_id)` as the raw JSON
//! string, mirroring the opaque key/value behaviour the session expects of
//! a real endpoint. Nothing is persisted across restarts.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

/// Key for one stored collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SiteKey {
    pub map_id: String,
    pub site_id: String,
}

impl SiteKey {
    #[must_use]
    pub fn new(map_id: impl Into<String>, site_id: impl Into<String>) -> Self {
        Self { map_id: map_id.into(), site_id: site_id.into() }
    }
}

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; the collection map is Arc-wrapped.
#[derive(Clone, Default)]
pub struct AppState {
    pub collections: Arc<RwLock<HashMap<SiteKey, String>>>,
}

impl AppState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
