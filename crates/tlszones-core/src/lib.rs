//! tlszones-core: Tumor-margin zoning and TLS classification (sans-IO).
//!
//! Partitions a tissue section into four spatial zones around a tumor
//! outline and assigns each tertiary lymphoid structure (TLS) candidate
//! to the zone it overlaps most:
//!
//! resolve inputs -> build zones -> classify candidates -> emit results.
//!
//! The crate talks to its annotation store only through the
//! [`AnnotationHost`] trait. [`InMemoryHost`] is the bundled
//! implementation; file and viewer integration live elsewhere.

pub mod calibration;
pub mod classify;
pub mod diagnostics;
pub mod emit;
pub mod geometry;
pub mod host;
pub mod pipeline;
pub mod resolve;
pub mod types;
pub mod zone;
pub mod zones;

pub use calibration::{CalibrationFactor, PixelCalibration};
pub use classify::{Assignment, Classification, RegionClassification};
pub use diagnostics::{
    Clock, StageDiagnostics, StageMetrics, StdClock, ZoningDiagnostics, ZoningSummary,
    run_with_diagnostics,
};
pub use emit::ZoneAnnotationIds;
pub use host::{Annotation, AnnotationHost, InMemoryHost, NewAnnotation, StoredAnnotation};
pub use pipeline::{Classified, Resolved, Zoned, Zoning, ZoningReport};
pub use resolve::{CandidateRegion, ResolvedInput};
pub use types::{
    AnnotationId, DuplicatePolicy, NoOverlapPolicy, Rgb, ZoneStyle, ZoningConfig, ZoningError,
};
pub use zone::{Zone, ZoneAreas, ZoneMap, ZoneSet};

/// Run the full zoning workflow against `host`.
///
/// # Steps
///
/// 1. Resolve tumor, tissue, candidates and calibration
/// 2. Build the center, inner margin, outer margin and stroma zones
/// 3. Classify each candidate by maximal overlap
/// 4. Add zone annotations, relabel candidates, retire the sources
///
/// # Errors
///
/// Returns a [`ZoningError`] if any input check fails. Every check runs
/// before the first write, so on error the host is left exactly as it
/// was.
pub fn run<H: AnnotationHost + ?Sized>(
    host: &mut H,
    config: &ZoningConfig,
) -> Result<ZoningReport, ZoningError> {
    let classified = Zoning::new(config.clone())
        .resolve(&*host)?
        .build_zones()?
        .classify();
    Ok(classified.emit(host))
}
