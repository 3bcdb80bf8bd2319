//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! [`crate::run`] runs everything in one call. [`Zoning`] lets the caller
//! drive execution one step at a time:
//!
//! ```rust
//! # use tlszones_core::{InMemoryHost, Zoning, ZoningConfig, ZoningError};
//! # fn zone(host: &mut InMemoryHost) -> Result<(), ZoningError> {
//! let zoned = Zoning::new(ZoningConfig::default())
//!     .resolve(&*host)?
//!     .build_zones()?;
//!
//! let center_area = zoned.areas().center;
//! let report = zoned.classify().emit(host);
//! # let _ = (center_area, report);
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state
//! (or `Result` for fallible stages), carrying all previously computed
//! intermediates. Only [`Classified::emit`] writes to the host, so
//! dropping a pipeline at any earlier stage leaves the host untouched.

use geo::{Area, MultiPolygon};

use crate::calibration::CalibrationFactor;
use crate::classify::{self, Classification};
use crate::diagnostics::StageMetrics;
use crate::emit::{self, SourceAnnotations, ZoneAnnotationIds};
use crate::host::AnnotationHost;
use crate::resolve::{self, ResolvedInput};
use crate::types::{AnnotationId, ZoningConfig, ZoningError};
use crate::zone::{ZoneAreas, ZoneSet};
use crate::zones;

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before anything has been read from the host.
#[must_use = "pipeline stages are consumed by advancing; call .resolve() to continue"]
#[derive(Debug, Clone)]
pub struct Zoning {
    config: ZoningConfig,
}

impl Zoning {
    /// Start a pipeline with the given configuration.
    pub const fn new(config: ZoningConfig) -> Self {
        Self { config }
    }

    /// The configuration this pipeline runs with.
    #[must_use]
    pub const fn config(&self) -> &ZoningConfig {
        &self.config
    }

    /// Read inputs from the host and advance to [`Resolved`].
    ///
    /// # Errors
    ///
    /// See [`resolve::resolve`].
    pub fn resolve<H: AnnotationHost + ?Sized>(self, host: &H) -> Result<Resolved, ZoningError> {
        let input = resolve::resolve(host, &self.config)?;
        Ok(Resolved {
            config: self.config,
            input,
        })
    }
}

// ───────────────────────── Stage 1: Resolved ─────────────────────────

/// Pipeline state after reading tumor, tissue, candidates and calibration.
#[must_use = "pipeline stages are consumed by advancing; call .build_zones() to continue"]
#[derive(Debug, Clone)]
pub struct Resolved {
    config: ZoningConfig,
    input: ResolvedInput,
}

impl Resolved {
    /// The resolved inputs.
    #[must_use]
    pub const fn input(&self) -> &ResolvedInput {
        &self.input
    }

    /// Resolution metrics.
    #[must_use]
    pub const fn metrics(&self) -> StageMetrics {
        StageMetrics::Resolve {
            annotation_count: self.input.annotation_count,
            candidate_count: self.input.candidates.len(),
            calibration: self.input.calibration.get(),
            anisotropic: self.input.anisotropic,
            margin_physical: self.config.margin_distance,
            margin_units: self.input.margin,
        }
    }

    /// Build the four zones and advance to [`Zoned`].
    ///
    /// # Errors
    ///
    /// Returns [`ZoningError::InvalidConfig`] if the margin in geometry
    /// units is not finite (an extremely small calibration factor can
    /// overflow it).
    pub fn build_zones(self) -> Result<Zoned, ZoningError> {
        let zones = zones::build_zones(&self.input.tumor, &self.input.tissue, self.input.margin)
            .map_err(|e| ZoningError::InvalidConfig(e.to_string()))?;
        let areas = zones::zone_areas(&zones);
        log::debug!(
            "zones built: center {:.1}, inner margin {:.1}, outer margin {:.1}, stroma {:.1} units²",
            areas.center,
            areas.inner_margin,
            areas.outer_margin,
            areas.stroma,
        );
        Ok(Zoned {
            config: self.config,
            input: self.input,
            zones,
            areas,
        })
    }
}

// ───────────────────────── Stage 2: Zoned ────────────────────────────

/// Pipeline state after zone construction.
#[must_use = "pipeline stages are consumed by advancing; call .classify() to continue"]
#[derive(Debug, Clone)]
pub struct Zoned {
    config: ZoningConfig,
    input: ResolvedInput,
    zones: ZoneSet,
    areas: ZoneAreas,
}

impl Zoned {
    /// The resolved inputs.
    #[must_use]
    pub const fn input(&self) -> &ResolvedInput {
        &self.input
    }

    /// The four zone geometries.
    #[must_use]
    pub const fn zones(&self) -> &ZoneSet {
        &self.zones
    }

    /// Area of each zone in squared geometry units.
    #[must_use]
    pub const fn areas(&self) -> &ZoneAreas {
        &self.areas
    }

    /// Zone construction metrics.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::BuildZones {
            margin_units: self.input.margin,
            tumor_area: self.input.tumor.unsigned_area(),
            tissue_area: self.input.tissue.unsigned_area(),
            zone_areas: self.areas.clone(),
            zone_vertices: zones::zone_vertex_counts(&self.zones),
        }
    }

    /// Classify every candidate and advance to [`Classified`].
    pub fn classify(self) -> Classified {
        let classification = classify::classify(
            &self.input.candidates,
            &self.zones,
            self.config.no_overlap_policy,
        );
        Classified {
            config: self.config,
            input: self.input,
            zones: self.zones,
            areas: self.areas,
            classification,
        }
    }
}

// ───────────────────────── Stage 3: Classified ───────────────────────

/// Pipeline state after classification, ready to be written back.
#[must_use = "pipeline stages are consumed by advancing; call .emit() to write the result"]
#[derive(Debug, Clone)]
pub struct Classified {
    config: ZoningConfig,
    input: ResolvedInput,
    zones: ZoneSet,
    areas: ZoneAreas,
    classification: Classification,
}

impl Classified {
    /// The four zone geometries.
    #[must_use]
    pub const fn zones(&self) -> &ZoneSet {
        &self.zones
    }

    /// The per-candidate classification.
    #[must_use]
    pub const fn classification(&self) -> &Classification {
        &self.classification
    }

    /// Classification metrics.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Classify {
            candidate_count: self.classification.len(),
            zone_counts: self.classification.zone_counts(),
            tie_count: self.classification.tie_count(),
            no_overlap_count: self.classification.no_overlap_count(),
        }
    }

    /// Write zones and labels to the host, finishing the pipeline.
    pub fn emit<H: AnnotationHost + ?Sized>(self, host: &mut H) -> ZoningReport {
        let sources = SourceAnnotations {
            tumor: self.input.tumor_id,
            tissue: self.input.tissue_id,
        };
        let zone_ids = emit::emit(host, &self.zones, &self.classification, sources, &self.config);
        log::info!(
            "zoned tumor {} within tissue {}: {} candidates classified, {} without overlap",
            sources.tumor,
            sources.tissue,
            self.classification.len() - self.classification.no_overlap_count(),
            self.classification.no_overlap_count(),
        );
        ZoningReport {
            tumor_id: sources.tumor,
            tissue_id: sources.tissue,
            tissue: self.input.tissue,
            calibration: self.input.calibration,
            margin: self.input.margin,
            zones: self.zones,
            zone_areas: self.areas,
            zone_ids,
            classification: self.classification,
            sources_removed: self.config.remove_source_annotations,
        }
    }
}

// ───────────────────────── Result ─────────────────────────────────────

/// Everything a completed invocation produced.
#[derive(Debug, Clone)]
pub struct ZoningReport {
    /// Identity the tumor annotation had before emission.
    pub tumor_id: AnnotationId,
    /// Identity the tissue annotation had before emission.
    pub tissue_id: AnnotationId,
    /// The tissue outline the zones partition.
    pub tissue: MultiPolygon<f64>,
    /// Physical length per geometry unit used for the margin.
    pub calibration: CalibrationFactor,
    /// Margin distance in geometry units.
    pub margin: f64,
    /// The four zone geometries.
    pub zones: ZoneSet,
    /// Area of each zone in squared geometry units.
    pub zone_areas: ZoneAreas,
    /// Identities of the zone annotations created in the host.
    pub zone_ids: ZoneAnnotationIds,
    /// Per-candidate classification.
    pub classification: Classification,
    /// Whether the tumor and tissue annotations were removed from the host.
    pub sources_removed: bool,
}

impl ZoningReport {
    /// Zone areas converted to squared physical units.
    #[must_use]
    pub fn physical_zone_areas(&self) -> ZoneAreas {
        let scale = self.calibration.get() * self.calibration.get();
        self.zone_areas.map(|_, area| area * scale)
    }
}
