//! Planar polygon geometry: area, perimeter, and the hectare label.
//!
//! DESIGN
//! ======
//! Coordinates are projected map units (metres for the projections the
//! surface draws in), so shoelace areas come out in square metres and can
//! be divided straight into hectares. Rings follow `GeoJSON`: the first
//! ring is the outer boundary, any further rings are holes.

use serde::{Deserialize, Serialize};

/// A single `[x, y]` position in projected units.
pub type Position = [f64; 2];

/// A linear ring. Closed rings repeat the first position at the end.
pub type Ring = Vec<Position>;

const SQUARE_METRES_PER_HECTARE: f64 = 10_000.0;

// =============================================================================
// GEOMETRY
// =============================================================================

/// Geometry carried by a drawn feature. Only polygons are drawable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Polygon(Vec<Ring>),
}

impl Geometry {
    /// Build a polygon from a single outer ring, closing it if needed.
    #[must_use]
    pub fn polygon(outer: Ring) -> Self {
        Self::Polygon(vec![close_ring(outer)])
    }

    #[must_use]
    pub fn rings(&self) -> &[Ring] {
        match self {
            Self::Polygon(rings) => rings,
        }
    }

    /// Planar area of the polygon in square units. Holes are subtracted.
    #[must_use]
    pub fn area(&self) -> f64 {
        let mut rings = self.rings().iter();
        let Some(outer) = rings.next() else {
            return 0.0;
        };
        let holes: f64 = rings.map(|ring| ring_area(ring)).sum();
        (ring_area(outer) - holes).max(0.0)
    }

    /// Perimeter of the outer ring.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.rings().first().map_or(0.0, |ring| ring_length(ring))
    }

    /// A polygon needs at least three distinct positions on its outer ring.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        let Some(outer) = self.rings().first() else {
            return true;
        };
        let mut distinct: Vec<Position> = Vec::with_capacity(outer.len());
        for pos in outer {
            if !distinct.contains(pos) {
                distinct.push(*pos);
            }
        }
        distinct.len() < 3
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Append the first position when the ring is not already closed.
#[must_use]
pub fn close_ring(mut ring: Ring) -> Ring {
    if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
        if first != last {
            ring.push(first);
        }
    }
    ring
}

/// Unsigned shoelace area. Works for open and closed rings alike.
#[must_use]
pub fn ring_area(ring: &[Position]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    for (i, a) in ring.iter().enumerate() {
        let b = ring[(i + 1) % ring.len()];
        twice_area += a[0] * b[1] - b[0] * a[1];
    }
    (twice_area / 2.0).abs()
}

/// Sum of segment lengths, including the closing segment of open rings.
#[must_use]
pub fn ring_length(ring: &[Position]) -> f64 {
    if ring.len() < 2 {
        return 0.0;
    }
    let closed = ring.first() == ring.last();
    let segments = if closed { ring.len() - 1 } else { ring.len() };
    (0..segments)
        .map(|i| {
            let a = ring[i];
            let b = ring[(i + 1) % ring.len()];
            (b[0] - a[0]).hypot(b[1] - a[1])
        })
        .sum()
}

/// Render an area as the `polygon-area` label, e.g. `"Area = 1.25 hectares"`.
///
/// Hectares are rounded to three decimals and printed without trailing zeros.
#[must_use]
pub fn format_area(area: f64) -> String {
    let hectares = (area / SQUARE_METRES_PER_HECTARE * 1000.0).round() / 1000.0;
    // Normalize -0.0 so an empty ring never prints as "-0".
    let hectares = if hectares == 0.0 { 0.0 } else { hectares };
    format!("Area = {hectares} hectares")
}

#[cfg(test)]
#[path = "geometry_test.rs"]
mod tests;
