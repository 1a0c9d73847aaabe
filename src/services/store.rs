//! Feature store: mirrors the drawing layer into site-scoped storage.
//!
//! DESIGN
//! ======
//! Two keys per site. The committed key holds the canonical collection;
//! the pending key holds the unsaved layer written while a committed copy
//! already exists, so new work never clobbers what was committed before.
//! `consolidate` folds pending into committed at session start and deletes
//! the pending key, after which only one key holds live data.
//!
//! Merges go through `FeatureCollection::merge`, which upserts by
//! `polygon-id`; a feature present in both keys appears once.
//!
//! ERROR HANDLING
//! ==============
//! Unparseable stored JSON surfaces as `StoreError::Corrupt` naming the key.
//! Nothing here overwrites a corrupt key implicitly.

use std::sync::Arc;

use tracing::{debug, info};

use crate::feature::{Feature, FeatureCollection, PolygonId};
use crate::site::{SiteId, StorageKeys};
use crate::storage::{Storage, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("stored collection under `{key}` is malformed: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("feature collection encode failed: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Which key a layer snapshot was written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Committed,
    Pending,
}

#[derive(Clone)]
pub struct FeatureStore {
    storage: Arc<dyn Storage>,
    site: SiteId,
    keys: StorageKeys,
}

impl FeatureStore {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, site: SiteId) -> Self {
        let keys = site.storage_keys();
        Self { storage, site, keys }
    }

    #[must_use]
    pub fn site(&self) -> &SiteId {
        &self.site
    }

    #[must_use]
    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// # Errors
    ///
    /// Returns a storage error or `Corrupt` if the stored JSON is malformed.
    pub fn committed(&self) -> Result<Option<FeatureCollection>, StoreError> {
        self.read(&self.keys.committed)
    }

    /// # Errors
    ///
    /// Returns a storage error or `Corrupt` if the stored JSON is malformed.
    pub fn pending(&self) -> Result<Option<FeatureCollection>, StoreError> {
        self.read(&self.keys.pending)
    }

    /// Persist a snapshot of the unsaved drawing layer.
    ///
    /// Area labels are recomputed and missing ids backfilled first. With no
    /// committed copy yet the snapshot becomes the committed collection;
    /// otherwise it replaces the pending collection.
    ///
    /// # Errors
    ///
    /// Returns a storage or encode error.
    pub fn record_layer(&self, mut layer: FeatureCollection) -> Result<Slot, StoreError> {
        layer.normalize();
        let slot = if self.storage.get_item(&self.keys.committed)?.is_none() {
            self.write(&self.keys.committed, &layer)?;
            Slot::Committed
        } else {
            self.write(&self.keys.pending, &layer)?;
            Slot::Pending
        };
        debug!(site_id = %self.site, count = layer.len(), ?slot, "drawing layer recorded");
        Ok(slot)
    }

    /// Fold the pending collection into the committed one and drop the
    /// pending key. Returns the number of pending features merged.
    ///
    /// # Errors
    ///
    /// Returns a storage error or `Corrupt` for malformed stored JSON.
    pub fn consolidate(&self) -> Result<usize, StoreError> {
        let Some(pending) = self.pending()? else {
            return Ok(0);
        };
        let merged_count = pending.len();
        let mut committed = self.committed()?.unwrap_or_default();
        committed.merge(pending);
        self.write(&self.keys.committed, &committed)?;
        self.storage.remove_item(&self.keys.pending)?;
        info!(site_id = %self.site, merged = merged_count, total = committed.len(), "pending features consolidated");
        Ok(merged_count)
    }

    /// Committed merged with pending, in memory only. `None` when neither
    /// key holds anything.
    ///
    /// # Errors
    ///
    /// Returns a storage error or `Corrupt` for malformed stored JSON.
    pub fn merged_view(&self) -> Result<Option<FeatureCollection>, StoreError> {
        let committed = self.committed()?;
        let pending = self.pending()?;
        Ok(match (committed, pending) {
            (None, None) => None,
            (Some(committed), None) => Some(committed),
            (None, Some(pending)) => Some(pending),
            (Some(mut committed), Some(pending)) => {
                committed.merge(pending);
                Some(committed)
            }
        })
    }

    /// Replace the stored copy of `feature`, matched by `polygon-id`, in
    /// whichever keys hold it. Returns `false` when no stored feature
    /// matches; nothing is written in that case.
    ///
    /// # Errors
    ///
    /// Returns a storage, encode, or `Corrupt` error.
    pub fn replace_feature(&self, feature: &Feature) -> Result<bool, StoreError> {
        let mut replaced = false;
        for key in [&self.keys.committed, &self.keys.pending] {
            let Some(mut collection) = self.read(key)? else {
                continue;
            };
            if collection.replace(feature.clone()) {
                self.write(key, &collection)?;
                replaced = true;
            }
        }
        Ok(replaced)
    }

    /// Remove the feature with `id` from each key that holds it. Returns
    /// `false` when neither key has a match.
    ///
    /// # Errors
    ///
    /// Returns a storage, encode, or `Corrupt` error.
    pub fn remove_feature(&self, id: &PolygonId) -> Result<bool, StoreError> {
        let mut removed = false;
        for key in [&self.keys.committed, &self.keys.pending] {
            let Some(mut collection) = self.read(key)? else {
                continue;
            };
            if collection.remove(id).is_some() {
                self.write(key, &collection)?;
                removed = true;
            }
        }
        Ok(removed)
    }

    /// Make `collection` the committed copy and drop any pending data.
    ///
    /// # Errors
    ///
    /// Returns a storage or encode error.
    pub fn replace_all(&self, mut collection: FeatureCollection) -> Result<(), StoreError> {
        collection.normalize();
        self.write(&self.keys.committed, &collection)?;
        self.storage.remove_item(&self.keys.pending)?;
        Ok(())
    }

    /// Remove both keys for this site.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.storage.remove_item(&self.keys.committed)?;
        self.storage.remove_item(&self.keys.pending)?;
        info!(site_id = %self.site, "local feature storage cleared");
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<FeatureCollection>, StoreError> {
        let Some(raw) = self.storage.get_item(key)? else {
            return Ok(None);
        };
        FeatureCollection::from_json(&raw)
            .map(Some)
            .map_err(|source| StoreError::Corrupt { key: key.to_owned(), source })
    }

    fn write(&self, key: &str, collection: &FeatureCollection) -> Result<(), StoreError> {
        let raw = collection.to_json().map_err(StoreError::Encode)?;
        self.storage.set_item(key, &raw)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
