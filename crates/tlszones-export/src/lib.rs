//! tlszones-export: Pure format serializers (sans-IO)
//!
//! Renders zoning results into viewable formats. Currently supports an
//! SVG preview of the zones with candidate outlines.

pub mod svg;

pub use svg::{
    CandidateOverlay, SvgMetadata, UNASSIGNED_COLOR, build_path_data, candidate_overlays, to_svg,
};
