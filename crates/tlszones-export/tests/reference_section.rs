//! Integration test: zone the bundled sample document and export an SVG preview.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;

use tlszones_core::{Assignment, AnnotationId, InMemoryHost, Zone, ZoningConfig};
use tlszones_export::{SvgMetadata, candidate_overlays, to_svg};

#[test]
fn reference_section_to_svg() {
    // Locate the sample document relative to the workspace root.
    let workspace_root = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf();
    let document_path = workspace_root.join("assets/samples/reference-section.json");
    assert!(
        document_path.exists(),
        "sample document not found at {document_path:?}"
    );

    let json = std::fs::read_to_string(&document_path).unwrap();
    let mut host: InMemoryHost = serde_json::from_str(&json).expect("document should parse");
    assert_eq!(host.annotations.len(), 6);

    // 100 physical units at 0.5 per pixel is a 200 pixel margin.
    let config = ZoningConfig {
        margin_distance: 100.0,
        ..ZoningConfig::default()
    };
    let report = tlszones_core::run(&mut host, &config).expect("zoning should succeed");

    let classification = &report.classification;
    assert_eq!(
        classification.get(AnnotationId(3)),
        Some(Assignment::Zone(Zone::Center))
    );
    assert_eq!(
        classification.get(AnnotationId(4)),
        Some(Assignment::Zone(Zone::OuterMargin))
    );
    assert_eq!(
        classification.get(AnnotationId(5)),
        Some(Assignment::Zone(Zone::Stroma))
    );
    // Unrelated annotations are left alone.
    assert_eq!(
        host.get(AnnotationId(6)).unwrap().label.as_deref(),
        Some("Necrosis")
    );

    let overlays = candidate_overlays(&host, classification);
    assert_eq!(overlays.len(), 3);

    let svg = to_svg(
        &report.zones,
        &config.zone_styles,
        &overlays,
        &SvgMetadata {
            title: Some("reference-section"),
            ..SvgMetadata::default()
        },
    );

    // Basic structural assertions.
    assert!(svg.contains("<svg"));
    assert!(svg.contains("viewBox="));
    for zone in Zone::ALL {
        assert!(svg.contains(&format!(r#"id="{}""#, zone.slug())), "{zone} missing");
    }
    assert!(svg.contains("</svg>"));

    // Write SVG to a temp location so we can inspect it.
    let output_path = workspace_root.join("target/reference-section.svg");
    if std::fs::create_dir_all(workspace_root.join("target")).is_ok() {
        std::fs::write(&output_path, &svg).unwrap();
        eprintln!("SVG written to {output_path:?} ({} bytes)", svg.len());
    }
}
