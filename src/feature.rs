//! Drawn features and feature collections in `GeoJSON` wire form.
//!
//! DESIGN
//! ======
//! A `Feature` is a polygon plus two derived properties: `polygon-area`
//! (the hectare label) and `polygon-id` (assigned once on draw). Any other
//! properties found in stored JSON are carried through untouched so a
//! round-trip never drops data written by another client.
//!
//! Collections keep insertion order. Identity is the `polygon-id`
//! property; `merge` and `upsert` use it to keep ids unique.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{Geometry, format_area};

// =============================================================================
// POLYGON ID
// =============================================================================

/// Locally-unique identifier stored in the `polygon-id` property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolygonId(String);

impl PolygonId {
    /// Fresh identifier for a newly drawn feature.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PolygonId {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

impl From<String> for PolygonId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for PolygonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// FEATURE
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
enum FeatureTag {
    #[default]
    Feature,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
enum CollectionTag {
    #[default]
    FeatureCollection,
}

/// Feature properties. Known keys are typed; everything else rides in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    #[serde(rename = "polygon-area", default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(rename = "polygon-id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PolygonId>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default)]
    tag: FeatureTag,
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: Properties,
}

impl Feature {
    /// New feature with a fresh id and a computed area label.
    #[must_use]
    pub fn drawn(geometry: Geometry) -> Self {
        let mut feature = Self::with_id(PolygonId::generate(), geometry);
        feature.refresh_area();
        feature
    }

    #[must_use]
    pub fn with_id(id: PolygonId, geometry: Geometry) -> Self {
        Self {
            tag: FeatureTag::Feature,
            geometry,
            properties: Properties { id: Some(id), ..Properties::default() },
        }
    }

    #[must_use]
    pub fn id(&self) -> Option<&PolygonId> {
        self.properties.id.as_ref()
    }

    #[must_use]
    pub fn area_label(&self) -> Option<&str> {
        self.properties.area.as_deref()
    }

    /// Recompute `polygon-area` from the current geometry.
    pub fn refresh_area(&mut self) {
        self.properties.area = Some(format_area(self.geometry.area()));
    }

    /// Give features loaded without an id one, so they can be matched later.
    pub fn ensure_id(&mut self) -> &PolygonId {
        self.properties.id.get_or_insert_with(PolygonId::generate)
    }

    /// Replace the geometry and keep the area label in step with it.
    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.geometry = geometry;
        self.refresh_area();
    }

    fn has_id(&self, id: &PolygonId) -> bool {
        self.id() == Some(id)
    }
}

// =============================================================================
// FEATURE COLLECTION
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default)]
    tag: CollectionTag,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_features(features: Vec<Feature>) -> Self {
        Self { tag: CollectionTag::FeatureCollection, features }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    #[must_use]
    pub fn contains(&self, id: &PolygonId) -> bool {
        self.features.iter().any(|f| f.has_id(id))
    }

    #[must_use]
    pub fn find(&self, id: &PolygonId) -> Option<&Feature> {
        self.features.iter().find(|f| f.has_id(id))
    }

    pub fn find_mut(&mut self, id: &PolygonId) -> Option<&mut Feature> {
        self.features.iter_mut().find(|f| f.has_id(id))
    }

    /// Ids in collection order, skipping features that have none.
    #[must_use]
    pub fn ids(&self) -> Vec<&PolygonId> {
        self.features.iter().filter_map(Feature::id).collect()
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    /// Replace the feature sharing `feature`'s id. Returns `false` and
    /// leaves the collection untouched when nothing matches.
    pub fn replace(&mut self, feature: Feature) -> bool {
        let Some(id) = feature.id().cloned() else {
            return false;
        };
        match self.find_mut(&id) {
            Some(slot) => {
                *slot = feature;
                true
            }
            None => false,
        }
    }

    /// Replace in place when the id is already present, append otherwise.
    /// Returns `true` when an existing feature was replaced.
    pub fn upsert(&mut self, feature: Feature) -> bool {
        if self.replace(feature.clone()) {
            return true;
        }
        self.features.push(feature);
        false
    }

    /// Remove exactly one feature with the given id.
    pub fn remove(&mut self, id: &PolygonId) -> Option<Feature> {
        let index = self.features.iter().position(|f| f.has_id(id))?;
        Some(self.features.remove(index))
    }

    /// Append `other`'s features. Features whose id is already present
    /// replace the existing entry, so the merged ids stay unique.
    pub fn merge(&mut self, other: FeatureCollection) {
        for feature in other.features {
            self.upsert(feature);
        }
    }

    /// Recompute area labels and backfill missing ids on every feature.
    pub fn normalize(&mut self) {
        for feature in &mut self.features {
            feature.refresh_area();
            feature.ensure_id();
        }
    }

    /// Serialize to the `GeoJSON` string stored locally and sent remotely.
    ///
    /// # Errors
    ///
    /// Returns a serde error if a property value cannot be encoded.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a `GeoJSON` feature collection string.
    ///
    /// # Errors
    ///
    /// Returns a serde error for malformed JSON or non-polygon geometry.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
#[path = "feature_test.rs"]
mod tests;
