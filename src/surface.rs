//! Drawing surface: the in-memory feature sources rendered on the map.
//!
//! DESIGN
//! ======
//! Two sources back the surface. `unsaved` holds polygons drawn in this
//! session; `saved` holds what was rendered from the committed collection
//! at start-up. Every feature lives in exactly one of them, so callers ask
//! `locate` which source owns an id before mutating instead of trying both
//! and ignoring failures.

use crate::feature::{Feature, FeatureCollection, PolygonId};
use crate::geometry::Geometry;

/// Which source owns a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backing {
    Unsaved,
    Saved,
}

#[derive(Debug, Default)]
pub struct Surface {
    unsaved: FeatureCollection,
    saved: FeatureCollection,
}

impl Surface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a freshly drawn polygon to the unsaved source.
    pub fn draw(&mut self, geometry: Geometry) -> Feature {
        let feature = Feature::drawn(geometry);
        self.unsaved.push(feature.clone());
        feature
    }

    /// Render a stored collection as the saved source, replacing whatever
    /// was rendered before.
    pub fn load_saved(&mut self, mut collection: FeatureCollection) {
        collection.normalize();
        self.unsaved = FeatureCollection::new();
        self.saved = collection;
    }

    #[must_use]
    pub fn locate(&self, id: &PolygonId) -> Option<Backing> {
        if self.unsaved.contains(id) {
            Some(Backing::Unsaved)
        } else if self.saved.contains(id) {
            Some(Backing::Saved)
        } else {
            None
        }
    }

    #[must_use]
    pub fn get(&self, id: &PolygonId) -> Option<&Feature> {
        self.unsaved.find(id).or_else(|| self.saved.find(id))
    }

    /// Apply an edited geometry. Returns the owning source and the updated
    /// feature, or `None` when the id is not on the surface.
    pub fn update_geometry(&mut self, id: &PolygonId, geometry: Geometry) -> Option<(Backing, Feature)> {
        let backing = self.locate(id)?;
        let feature = self.source_mut(backing).find_mut(id)?;
        feature.set_geometry(geometry);
        Some((backing, feature.clone()))
    }

    /// Remove a feature from the source that owns it.
    pub fn remove(&mut self, id: &PolygonId) -> Option<(Backing, Feature)> {
        let backing = self.locate(id)?;
        let feature = self.source_mut(backing).remove(id)?;
        Some((backing, feature))
    }

    /// Snapshot of the unsaved source, as recorded into storage.
    #[must_use]
    pub fn unsaved(&self) -> &FeatureCollection {
        &self.unsaved
    }

    #[must_use]
    pub fn saved(&self) -> &FeatureCollection {
        &self.saved
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.unsaved.len() + self.saved.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every rendered feature.
    pub fn clear(&mut self) {
        self.unsaved = FeatureCollection::new();
        self.saved = FeatureCollection::new();
    }

    fn source_mut(&mut self, backing: Backing) -> &mut FeatureCollection {
        match backing {
            Backing::Unsaved => &mut self.unsaved,
            Backing::Saved => &mut self.saved,
        }
    }
}

#[cfg(test)]
#[path = "surface_test.rs"]
mod tests;
