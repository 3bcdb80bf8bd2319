//! SVG preview serializer.
//!
//! Renders the four zones as filled `<path>` elements and overlays each
//! candidate region as an outline stroked in the color of the zone it was
//! assigned to. Document construction, XML escaping and path data
//! formatting go through the [`svg`] crate.
//!
//! The `viewBox` is the bounding box of the zones, so coordinates are
//! emitted unchanged in geometry units (image pixels, y pointing down).
//!
//! This is a pure function with no I/O -- it returns a `String`.

use geo::{BoundingRect, Coord, LineString, MultiPolygon, Rect, coord};
use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Description, Element, Group, Path, Title};
use svg::node::{Node, Text, Value};

use tlszones_core::geometry::to_multi_polygon;
use tlszones_core::{Classification, InMemoryHost, Rgb, Zone, ZoneMap, ZoneSet, ZoneStyle};

/// Outline color for candidates that were not assigned to any zone.
pub const UNASSIGNED_COLOR: Rgb = Rgb::new(128, 128, 128);

/// Opacity applied to zone fills so overlapping candidates stay visible.
const ZONE_FILL_OPACITY: f64 = 0.45;

/// Metadata to embed in the SVG document.
///
/// All fields are optional. When present, `<title>`, `<desc>` and
/// `<metadata>` elements are emitted before any drawing.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the source document's file stem.
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized zoning configuration, embedded in a namespaced
    /// `<tlszones:config>` element inside `<metadata>`.
    pub config_json: Option<&'a str>,
}

/// A candidate region to draw on top of the zones.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateOverlay {
    /// The candidate outline.
    pub geometry: MultiPolygon<f64>,
    /// The zone it was assigned to, if any.
    pub assignment: Option<Zone>,
}

/// Collect overlays for every classified candidate still present in
/// `host`.
///
/// Candidates whose annotation has disappeared or is not areal are
/// skipped.
#[must_use]
pub fn candidate_overlays(host: &InMemoryHost, classification: &Classification) -> Vec<CandidateOverlay> {
    classification
        .regions()
        .iter()
        .filter_map(|region| {
            let stored = host.get(region.id)?;
            let geometry = to_multi_polygon(&stored.geometry).ok()?;
            Some(CandidateOverlay {
                geometry,
                assignment: region.assignment.zone(),
            })
        })
        .collect()
}

/// Build an SVG path `d` attribute string from a multi-polygon.
///
/// Every ring (exterior and interior) becomes its own closed subpath:
/// `M` for the first vertex, `L` for the rest, then `z`. Rings with fewer
/// than three distinct vertices are skipped. Returns an empty string when
/// nothing remains.
///
/// Coordinates are formatted by the [`svg`] crate using `f32` precision.
///
/// # Examples
///
/// ```
/// use geo::{Rect, coord};
/// use tlszones_export::build_path_data;
///
/// let square = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 10.0, y: 10.0 });
/// let d = build_path_data(&square.to_polygon().into());
/// assert!(d.starts_with("M"));
/// assert_eq!(d.matches('L').count(), 3);
/// ```
#[must_use]
pub fn build_path_data(geometry: &MultiPolygon<f64>) -> String {
    let mut data = Data::new();
    let mut any = false;
    for polygon in geometry {
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            let Some(open) = open_ring(ring) else {
                continue;
            };
            data = data.move_to((open[0].x, open[0].y));
            for c in &open[1..] {
                data = data.line_to((c.x, c.y));
            }
            data = data.close();
            any = true;
        }
    }
    if any {
        String::from(Value::from(data))
    } else {
        String::new()
    }
}

/// Ring vertices without the closing repeat, or `None` if degenerate.
fn open_ring(ring: &LineString<f64>) -> Option<&[Coord<f64>]> {
    let coords = ring.0.as_slice();
    let open = match coords.split_last() {
        Some((last, rest)) if rest.first() == Some(last) => rest,
        _ => coords,
    };
    (open.len() >= 3).then_some(open)
}

/// Smallest rectangle covering every zone, or `None` if all are empty.
fn zones_bounds(zones: &ZoneSet) -> Option<Rect<f64>> {
    zones
        .iter()
        .filter_map(|(_, geometry)| geometry.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            )
        })
}

/// Serialize zones and candidate overlays into an SVG document string.
///
/// Zones are drawn first, in [`Zone::ALL`] order, each as a single path
/// with `fill-rule="evenodd"` so polygon holes render as holes. The zone
/// path carries the zone's slug as its `id`. Candidates follow in a
/// group, outlined in their zone's style color, or [`UNASSIGNED_COLOR`]
/// when unassigned.
#[must_use]
pub fn to_svg(
    zones: &ZoneSet,
    styles: &ZoneMap<ZoneStyle>,
    candidates: &[CandidateOverlay],
    metadata: &SvgMetadata<'_>,
) -> String {
    let (min_x, min_y, width, height) = zones_bounds(zones)
        .map_or((0.0, 0.0, 0.0, 0.0), |r| (r.min().x, r.min().y, r.width(), r.height()));
    let mut doc = Document::new()
        .set("width", width)
        .set("height", height)
        .set("viewBox", (min_x, min_y, width, height));

    // Optional <title> element
    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    // Optional <desc> element
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    // Optional <metadata> element with structured zoning config
    if let Some(config_json) = metadata.config_json {
        let mut config_el = Element::new("tlszones:config");
        config_el.assign("xmlns:tlszones", "https://tlszones.github.io/ns/1");
        config_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(config_el);
        doc = doc.add(metadata_el);
    }

    for zone in Zone::ALL {
        let d = build_path_data(zones.get(zone));
        if d.is_empty() {
            continue;
        }
        let path = Path::new()
            .set("id", zone.slug())
            .set("d", d)
            .set("fill", styles.get(zone).color.to_hex())
            .set("fill-opacity", ZONE_FILL_OPACITY)
            .set("fill-rule", "evenodd")
            .set("stroke", "none");
        doc = doc.add(path);
    }

    let mut overlay = Group::new().set("id", "candidates").set("fill", "none");
    for candidate in candidates {
        let d = build_path_data(&candidate.geometry);
        if d.is_empty() {
            continue;
        }
        let color = candidate
            .assignment
            .map_or(UNASSIGNED_COLOR, |zone| styles.get(zone).color);
        overlay = overlay.add(
            Path::new()
                .set("d", d)
                .set("stroke", color.to_hex())
                .set("stroke-width", 2)
                .set("vector-effect", "non-scaling-stroke"),
        );
    }
    doc = doc.add(overlay);

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
