//! Normalizing host geometry into the areal form the zoning operates on.
//!
//! Hosts hand over arbitrary [`Geometry`] values. Zoning only makes sense
//! for areas, so everything is flattened into a [`MultiPolygon`]; points,
//! lines and non-finite coordinates are rejected.

use geo::{BooleanOps, CoordsIter, Geometry, MultiPolygon};

/// Why a geometry could not be used as an area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AreaRejection {
    /// The geometry (or a member of a collection) has no area.
    NotAreal(&'static str),
    /// A coordinate is NaN or infinite.
    NonFinite,
}

impl std::fmt::Display for AreaRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAreal(kind) => write!(f, "{kind} geometry has no area"),
            Self::NonFinite => f.write_str("geometry has non-finite coordinates"),
        }
    }
}

/// An empty multipolygon.
#[must_use]
pub const fn empty() -> MultiPolygon<f64> {
    MultiPolygon(Vec::new())
}

/// Convert a host geometry into a [`MultiPolygon`].
///
/// Polygons, rectangles and triangles convert directly. Multipolygons
/// with more than one member and geometry collections are unioned member
/// by member, so overlapping parts count once. Boolean operations fill
/// by even-odd, so an overlap left in place would read as a hole.
///
/// # Errors
///
/// Returns [`AreaRejection::NotAreal`] for points, lines and line strings
/// (including inside collections) and [`AreaRejection::NonFinite`] when any
/// coordinate is NaN or infinite.
pub fn to_multi_polygon(geometry: &Geometry<f64>) -> Result<MultiPolygon<f64>, AreaRejection> {
    if !geometry
        .coords_iter()
        .all(|c| c.x.is_finite() && c.y.is_finite())
    {
        return Err(AreaRejection::NonFinite);
    }
    flatten(geometry)
}

fn flatten(geometry: &Geometry<f64>) -> Result<MultiPolygon<f64>, AreaRejection> {
    match geometry {
        Geometry::Polygon(p) => Ok(MultiPolygon::new(vec![p.clone()])),
        Geometry::MultiPolygon(mp) if mp.0.len() <= 1 => Ok(mp.clone()),
        Geometry::MultiPolygon(mp) => Ok(mp
            .iter()
            .fold(empty(), |merged, member| {
                merged.union(&MultiPolygon::new(vec![member.clone()]))
            })),
        Geometry::Rect(r) => Ok(MultiPolygon::new(vec![r.to_polygon()])),
        Geometry::Triangle(t) => Ok(MultiPolygon::new(vec![t.to_polygon()])),
        Geometry::GeometryCollection(gc) => {
            let mut merged = empty();
            for member in gc {
                let part = flatten(member)?;
                merged = merged.union(&part);
            }
            Ok(merged)
        }
        Geometry::Point(_) => Err(AreaRejection::NotAreal("point")),
        Geometry::MultiPoint(_) => Err(AreaRejection::NotAreal("multi-point")),
        Geometry::Line(_) => Err(AreaRejection::NotAreal("line")),
        Geometry::LineString(_) => Err(AreaRejection::NotAreal("line string")),
        Geometry::MultiLineString(_) => Err(AreaRejection::NotAreal("multi-line string")),
    }
}

/// Total number of exterior and interior ring vertices, for diagnostics.
#[must_use]
pub fn vertex_count(mp: &MultiPolygon<f64>) -> usize {
    mp.coords_count()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use geo::{Area, GeometryCollection, Rect, coord, line_string, point, polygon};

    use super::*;

    #[test]
    fn polygon_converts() {
        let poly = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)];
        let mp = to_multi_polygon(&Geometry::Polygon(poly)).unwrap();
        assert_eq!(mp.0.len(), 1);
        assert!((mp.unsigned_area() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn rect_converts() {
        let rect = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 3.0, y: 2.0 });
        let mp = to_multi_polygon(&Geometry::Rect(rect)).unwrap();
        assert!((mp.unsigned_area() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn point_is_rejected() {
        let result = to_multi_polygon(&Geometry::Point(point!(x: 1.0, y: 1.0)));
        assert_eq!(result, Err(AreaRejection::NotAreal("point")));
    }

    #[test]
    fn line_string_is_rejected() {
        let ls = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)];
        let result = to_multi_polygon(&Geometry::LineString(ls));
        assert_eq!(result, Err(AreaRejection::NotAreal("line string")));
    }

    #[test]
    fn nan_coordinate_is_rejected() {
        let poly = polygon![(x: 0.0, y: 0.0), (x: f64::NAN, y: 0.0), (x: 1.0, y: 1.0)];
        let result = to_multi_polygon(&Geometry::Polygon(poly));
        assert_eq!(result, Err(AreaRejection::NonFinite));
    }

    #[test]
    fn overlapping_collection_is_unioned() {
        let a = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 2.0, y: 2.0 });
        let b = Rect::new(coord! { x: 1.0, y: 0.0 }, coord! { x: 3.0, y: 2.0 });
        let gc = GeometryCollection::new_from(vec![Geometry::Rect(a), Geometry::Rect(b)]);
        let mp = to_multi_polygon(&Geometry::GeometryCollection(gc)).unwrap();
        assert!((mp.unsigned_area() - 6.0).abs() < 1e-6);
    }

    #[test]
    fn overlapping_multi_polygon_members_are_unioned() {
        let a = Rect::new(coord! { x: 1000.0, y: 1000.0 }, coord! { x: 2000.0, y: 2000.0 });
        let b = Rect::new(coord! { x: 1500.0, y: 1500.0 }, coord! { x: 2200.0, y: 2200.0 });
        let mp = MultiPolygon::new(vec![a.to_polygon(), b.to_polygon()]);
        let merged = to_multi_polygon(&Geometry::MultiPolygon(mp)).unwrap();
        // 1000² + 700² minus the shared 500².
        assert!((merged.unsigned_area() - 1_240_000.0).abs() < 1e-6);
        assert_eq!(merged.0.len(), 1);
        assert!(merged.0[0].interiors().is_empty());
    }

    #[test]
    fn disjoint_multi_polygon_members_are_kept() {
        let a = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 });
        let b = Rect::new(coord! { x: 5.0, y: 5.0 }, coord! { x: 7.0, y: 7.0 });
        let mp = MultiPolygon::new(vec![a.to_polygon(), b.to_polygon()]);
        let merged = to_multi_polygon(&Geometry::MultiPolygon(mp)).unwrap();
        assert_eq!(merged.0.len(), 2);
        assert!((merged.unsigned_area() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn collection_with_point_is_rejected() {
        let a = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 2.0, y: 2.0 });
        let gc = GeometryCollection::new_from(vec![
            Geometry::Rect(a),
            Geometry::Point(point!(x: 5.0, y: 5.0)),
        ]);
        let result = to_multi_polygon(&Geometry::GeometryCollection(gc));
        assert_eq!(result, Err(AreaRejection::NotAreal("point")));
    }

    #[test]
    fn vertex_count_sums_rings() {
        let poly = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)];
        // Closed exterior ring: four corners plus the repeated first point.
        assert_eq!(vertex_count(&MultiPolygon::new(vec![poly])), 5);
    }
}
