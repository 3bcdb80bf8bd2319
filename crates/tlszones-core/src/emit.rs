//! Result emission: write zones and candidate labels back to the host.
//!
//! Only called once every earlier stage has succeeded, so a host sees
//! either the complete result or nothing at all.

use geo::MultiPolygon;

use crate::classify::Classification;
use crate::host::{AnnotationHost, NewAnnotation};
use crate::types::{AnnotationId, ZoningConfig};
use crate::zone::{ZoneMap, ZoneSet};

/// Identities of the zone annotations created in the host.
pub type ZoneAnnotationIds = ZoneMap<AnnotationId>;

/// Which source annotations to retire after zoning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceAnnotations {
    /// The tumor outline.
    pub tumor: AnnotationId,
    /// The tissue outline.
    pub tissue: AnnotationId,
}

/// Write the zoning result into `host`.
///
/// 1. Add one annotation per zone, named, colored and (optionally) locked
///    per `config`.
/// 2. Label every classified candidate with its zone's candidate label.
///    Candidates without overlap keep their existing label.
/// 3. Remove the source tumor and tissue annotations when
///    `config.remove_source_annotations` is set.
/// 4. Notify the host once.
pub fn emit<H: AnnotationHost + ?Sized>(
    host: &mut H,
    zones: &ZoneSet,
    classification: &Classification,
    sources: SourceAnnotations,
    config: &ZoningConfig,
) -> ZoneAnnotationIds {
    let ids = zones.map(|zone, geometry: &MultiPolygon<f64>| {
        let style = config.zone_styles.get(zone);
        host.add_annotation(NewAnnotation {
            geometry: geometry.clone(),
            name: style.name.clone(),
            color: style.color,
            locked: config.lock_new_annotations,
        })
    });

    for region in classification.regions() {
        if let Some(zone) = region.assignment.zone() {
            host.set_annotation_label(region.id, config.candidate_labels.get(zone));
        }
    }

    if config.remove_source_annotations {
        host.remove_annotation(sources.tumor);
        host.remove_annotation(sources.tissue);
    }

    host.notify_changed();
    ids
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use geo::{Rect, coord};

    use super::*;
    use crate::classify::classify;
    use crate::host::InMemoryHost;
    use crate::resolve::CandidateRegion;
    use crate::types::NoOverlapPolicy;
    use crate::zone::Zone;
    use crate::zones::build_zones;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Rect<f64> {
        Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 })
    }

    fn mp(r: Rect<f64>) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![r.to_polygon()])
    }

    struct Fixture {
        host: InMemoryHost,
        zones: ZoneSet,
        classification: Classification,
        sources: SourceAnnotations,
        inside: AnnotationId,
        outside: AnnotationId,
    }

    fn fixture() -> Fixture {
        let mut host = InMemoryHost::default();
        let tissue = host.insert(Some("Tissue"), rect(0.0, 0.0, 300.0, 300.0));
        let tumor = host.insert(Some("Tumor"), rect(100.0, 100.0, 200.0, 200.0));
        let inside = host.insert(Some("TLS"), rect(140.0, 140.0, 160.0, 160.0));
        let outside = host.insert(Some("TLS"), rect(400.0, 400.0, 410.0, 410.0));

        let zones = build_zones(
            &mp(rect(100.0, 100.0, 200.0, 200.0)),
            &mp(rect(0.0, 0.0, 300.0, 300.0)),
            20.0,
        )
        .unwrap();
        let candidates = [
            CandidateRegion {
                id: inside,
                geometry: mp(rect(140.0, 140.0, 160.0, 160.0)),
            },
            CandidateRegion {
                id: outside,
                geometry: mp(rect(400.0, 400.0, 410.0, 410.0)),
            },
        ];
        let classification = classify(&candidates, &zones, NoOverlapPolicy::Unclassified);
        Fixture {
            host,
            zones,
            classification,
            sources: SourceAnnotations { tumor, tissue },
            inside,
            outside,
        }
    }

    #[test]
    fn adds_styled_zone_annotations() {
        let mut f = fixture();
        let config = ZoningConfig::default();
        let ids = emit(&mut f.host, &f.zones, &f.classification, f.sources, &config);

        for zone in Zone::ALL {
            let stored = f.host.get(*ids.get(zone)).unwrap();
            let style = config.zone_styles.get(zone);
            assert_eq!(stored.name.as_deref(), Some(style.name.as_str()));
            assert_eq!(stored.color, Some(style.color));
            assert!(stored.locked);
        }
    }

    #[test]
    fn labels_classified_candidates_only() {
        let mut f = fixture();
        let config = ZoningConfig::default();
        emit(&mut f.host, &f.zones, &f.classification, f.sources, &config);

        assert_eq!(
            f.host.get(f.inside).unwrap().label.as_deref(),
            Some("TLS Center")
        );
        assert_eq!(f.host.get(f.outside).unwrap().label.as_deref(), Some("TLS"));
    }

    #[test]
    fn removes_sources_and_notifies_once() {
        let mut f = fixture();
        emit(
            &mut f.host,
            &f.zones,
            &f.classification,
            f.sources,
            &ZoningConfig::default(),
        );
        assert!(f.host.get(f.sources.tumor).is_none());
        assert!(f.host.get(f.sources.tissue).is_none());
        assert_eq!(f.host.change_notifications(), 1);
        // Two candidates plus four zones.
        assert_eq!(f.host.annotations.len(), 6);
    }

    #[test]
    fn keeps_sources_and_unlocks_when_configured() {
        let mut f = fixture();
        let config = ZoningConfig {
            lock_new_annotations: false,
            remove_source_annotations: false,
            ..ZoningConfig::default()
        };
        let ids = emit(&mut f.host, &f.zones, &f.classification, f.sources, &config);
        assert!(f.host.get(f.sources.tumor).is_some());
        assert!(!f.host.get(ids.center).unwrap().locked);
    }
}
