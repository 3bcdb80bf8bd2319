//! Zone construction: partition the tissue into center, inner margin,
//! outer margin and stroma relative to the tumor boundary.
//!
//! All operations are boolean ops and buffers from [`geo`]. The order of
//! operations is fixed:
//!
//! 1. `outer_expanded = buffer(tumor, +margin)`
//! 2. `outer_margin = (outer_expanded - tumor) ∩ tissue`
//! 3. `center = buffer(tumor, -margin) ∩ tissue`
//! 4. `inner_unclipped = tumor - buffer(tumor, -margin)`
//! 5. `inner_margin = inner_unclipped ∩ tissue`
//! 6. `stroma = tissue - center - outer_margin - inner_margin`
//!
//! Step 4 subtracts the *unclipped* eroded tumor, not `center`. Parts of
//! the eroded tumor that stick out of the tissue must not leak into the
//! inner margin before clipping.
//!
//! Empty intermediates are normal (a margin wider than the tumor's
//! inradius erodes it completely; a tumor outside the tissue clips to
//! nothing) and never cause an error.

use geo::{Area, BooleanOps, Buffer, MultiPolygon};

use crate::geometry;
use crate::zone::{ZoneAreas, ZoneMap, ZoneSet};

/// Error from [`build_zones`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("margin distance must be finite and non-negative, got {0}")]
pub struct InvalidMargin(pub f64);

/// Build the four zones from tumor and tissue outlines.
///
/// `margin` is in geometry units (already divided by the calibration
/// factor). A zero margin yields an empty inner and outer margin.
///
/// # Errors
///
/// Returns [`InvalidMargin`] if `margin` is negative or not finite.
pub fn build_zones(
    tumor: &MultiPolygon<f64>,
    tissue: &MultiPolygon<f64>,
    margin: f64,
) -> Result<ZoneSet, InvalidMargin> {
    if !margin.is_finite() || margin < 0.0 {
        return Err(InvalidMargin(margin));
    }

    let (expanded, eroded) = if margin > 0.0 {
        (tumor.buffer(margin), tumor.buffer(-margin))
    } else {
        (tumor.clone(), tumor.clone())
    };

    let outer_margin = expanded.difference(tumor).intersection(tissue);
    let center = eroded.intersection(tissue);
    let inner_margin = tumor.difference(&eroded).intersection(tissue);
    let stroma = tissue
        .difference(&center)
        .difference(&outer_margin)
        .difference(&inner_margin);

    Ok(ZoneSet {
        center,
        inner_margin,
        outer_margin,
        stroma,
    })
}

/// Area of every zone.
#[must_use]
pub fn zone_areas(zones: &ZoneSet) -> ZoneAreas {
    zones.map(|_, geometry| geometry.unsigned_area())
}

/// Vertex count of every zone, for diagnostics.
#[must_use]
pub fn zone_vertex_counts(zones: &ZoneSet) -> ZoneMap<usize> {
    zones.map(|_, geometry| geometry::vertex_count(geometry))
}
