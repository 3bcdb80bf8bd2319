//! Zoning diagnostics: timing, areas and counts for each stage.
//!
//! [`run_with_diagnostics`] drives the incremental pipeline and records
//! per-stage durations alongside the metrics each stage exposes. Time is
//! read through the [`Clock`] trait so callers (and tests) choose the
//! time source.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::{Duration, Instant};

use geo::Area;
use serde::{Deserialize, Serialize};

use crate::host::AnnotationHost;
use crate::pipeline::{Zoning, ZoningReport};
use crate::types::{ZoningConfig, ZoningError};
use crate::zone::{Zone, ZoneAreas, ZoneMap};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// A monotonic time source.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] backed by [`std::time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Diagnostics collected from a single zoning invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoningDiagnostics {
    /// Stage 1: input resolution.
    pub resolve: StageDiagnostics,
    /// Stage 2: zone construction.
    pub build_zones: StageDiagnostics,
    /// Stage 3: candidate classification.
    pub classify: StageDiagnostics,
    /// Stage 4: writing results to the host.
    pub emit: StageDiagnostics,
    /// Total wall-clock duration of the invocation (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary across all stages.
    pub summary: ZoningSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Input resolution metrics.
    Resolve {
        /// Annotations listed by the host.
        annotation_count: usize,
        /// Candidate regions found.
        candidate_count: usize,
        /// Physical length per geometry unit.
        calibration: f64,
        /// Pixel width and height differed beyond tolerance.
        anisotropic: bool,
        /// Margin distance in physical units.
        margin_physical: f64,
        /// Margin distance in geometry units.
        margin_units: f64,
    },
    /// Zone construction metrics.
    BuildZones {
        /// Margin distance in geometry units.
        margin_units: f64,
        /// Tumor area in squared geometry units.
        tumor_area: f64,
        /// Tissue area in squared geometry units.
        tissue_area: f64,
        /// Area of each zone in squared geometry units.
        zone_areas: ZoneAreas,
        /// Vertex count of each zone geometry.
        zone_vertices: ZoneMap<usize>,
    },
    /// Classification metrics.
    Classify {
        /// Candidates classified.
        candidate_count: usize,
        /// Candidates assigned to each zone.
        zone_counts: ZoneMap<usize>,
        /// Candidates whose maximal overlap was tied.
        tie_count: usize,
        /// Candidates overlapping no zone.
        no_overlap_count: usize,
    },
    /// Emission metrics.
    Emit {
        /// Zone annotations created.
        created: usize,
        /// Candidate labels set.
        labeled: usize,
        /// Source annotations removed.
        removed: usize,
    },
}

/// High-level summary of one invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoningSummary {
    /// Physical length per geometry unit.
    pub calibration: f64,
    /// Margin distance in geometry units.
    pub margin_units: f64,
    /// Tissue area in squared geometry units.
    pub tissue_area: f64,
    /// Area of each zone in squared geometry units.
    pub zone_areas: ZoneAreas,
    /// Number of candidate regions.
    pub candidate_count: usize,
    /// Candidates assigned to each zone.
    pub zone_counts: ZoneMap<usize>,
    /// Candidates whose maximal overlap was tied.
    pub tie_count: usize,
    /// Candidates overlapping no zone.
    pub no_overlap_count: usize,
}

/// Run the whole pipeline, collecting diagnostics.
///
/// # Errors
///
/// Returns the first [`ZoningError`] raised by any stage; the host is not
/// modified in that case.
pub fn run_with_diagnostics<H, C>(
    host: &mut H,
    config: &ZoningConfig,
    clock: &C,
) -> Result<(ZoningReport, ZoningDiagnostics), ZoningError>
where
    H: AnnotationHost + ?Sized,
    C: Clock,
{
    let total_start = clock.now();

    let start = clock.now();
    let resolved = Zoning::new(config.clone()).resolve(&*host)?;
    let resolve = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: resolved.metrics(),
    };

    let start = clock.now();
    let zoned = resolved.build_zones()?;
    let build_zones = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: zoned.metrics(),
    };
    let tissue_area = zoned.input().tissue.unsigned_area();

    let start = clock.now();
    let classified = zoned.classify();
    let classify = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: classified.metrics(),
    };

    let start = clock.now();
    let report = classified.emit(host);
    let labeled = report.classification.len() - report.classification.no_overlap_count();
    let emit = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Emit {
            created: Zone::ALL.len(),
            labeled,
            removed: if report.sources_removed { 2 } else { 0 },
        },
    };

    let summary = ZoningSummary {
        calibration: report.calibration.get(),
        margin_units: report.margin,
        tissue_area,
        zone_areas: report.zone_areas.clone(),
        candidate_count: report.classification.len(),
        zone_counts: report.classification.zone_counts(),
        tie_count: report.classification.tie_count(),
        no_overlap_count: report.classification.no_overlap_count(),
    };

    let diagnostics = ZoningDiagnostics {
        resolve,
        build_zones,
        classify,
        emit,
        total_duration: clock.elapsed(&total_start),
        summary,
    };
    Ok((report, diagnostics))
}

impl ZoningDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Zoning Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Calibration: {:.4}/unit  |  Margin: {:.1} units",
            self.summary.calibration, self.summary.margin_units,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<16} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Resolve", &self.resolve),
            ("Build Zones", &self.build_zones),
            ("Classify", &self.classify),
            ("Emit", &self.emit),
        ];
        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<16} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "{:<16} {:>16} {:>9} {:>10}",
            "Zone", "Area (units²)", "% Tissue", "Candidates"
        ));
        lines.push("-".repeat(60));
        for (zone, area) in self.summary.zone_areas.iter() {
            let pct = if self.summary.tissue_area > 0.0 {
                area / self.summary.tissue_area * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "{:<16} {area:>16.1} {pct:>8.1}% {:>10}",
                zone.to_string(),
                self.summary.zone_counts.get(zone),
            ));
        }

        lines.push(String::new());
        lines.push(format!(
            "Candidates: {}  |  Ties: {}  |  Without overlap: {}",
            self.summary.candidate_count, self.summary.tie_count, self.summary.no_overlap_count,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Resolve {
            annotation_count,
            candidate_count,
            anisotropic,
            margin_physical,
            margin_units,
            ..
        } => format!(
            "{annotation_count} annotations, {candidate_count} candidates, margin {margin_physical:.1} -> {margin_units:.1} units{}",
            if *anisotropic { " (anisotropic pixels averaged)" } else { "" },
        ),
        StageMetrics::BuildZones {
            tumor_area,
            tissue_area,
            zone_vertices,
            ..
        } => {
            let vertices: usize = zone_vertices.iter().map(|(_, n)| *n).sum();
            format!("tumor={tumor_area:.0} tissue={tissue_area:.0} vertices={vertices}")
        }
        StageMetrics::Classify {
            candidate_count,
            tie_count,
            no_overlap_count,
            ..
        } => format!("{candidate_count} candidates, {tie_count} ties, {no_overlap_count} outside"),
        StageMetrics::Emit {
            created,
            labeled,
            removed,
        } => format!("+{created} zones, {labeled} labeled, -{removed} sources"),
    }
}
