//! Shared types for the zoning pipeline: identities, styles, configuration
//! and errors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::zone::{Zone, ZoneMap};

/// Stable reference to one annotation inside an
/// [`AnnotationHost`](crate::host::AnnotationHost).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(pub u64);

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An 8-bit RGB display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Create a new color.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// CSS hex notation, e.g. `#c81e1e`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// How a zone annotation is presented by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneStyle {
    /// Display name given to the created annotation.
    pub name: String,
    /// Display color given to the created annotation.
    pub color: Rgb,
}

impl ZoneStyle {
    fn new(name: &str, color: Rgb) -> Self {
        Self {
            name: name.to_owned(),
            color,
        }
    }
}

/// What to do when more than one annotation carries the tumor or tissue
/// label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    /// Fail with [`ZoningError::DuplicateAnnotation`].
    #[default]
    Reject,
    /// Use the first match in host enumeration order and log a warning.
    FirstMatch,
}

/// What to do with a candidate region that overlaps none of the zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NoOverlapPolicy {
    /// Report [`Assignment::NoOverlap`](crate::classify::Assignment::NoOverlap)
    /// and leave the candidate's label untouched.
    #[default]
    Unclassified,
    /// Assign the first zone of [`Zone::TIE_BREAK_PRIORITY`], as if every
    /// zone tied at zero overlap.
    PriorityFallback,
}

/// Configuration for one zoning invocation.
///
/// Fixed at invocation start. All fields have defaults matching the
/// reference use case (micrometer calibration, 500 µm margin).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoningConfig {
    /// Width of the inner and outer margin bands, in physical units
    /// (the same unit as the host calibration, typically micrometers).
    pub margin_distance: f64,

    /// Whether the created zone annotations are locked against editing.
    pub lock_new_annotations: bool,

    /// Whether the source tumor and tissue annotations are removed once the
    /// zone annotations supersede them.
    pub remove_source_annotations: bool,

    /// Label identifying the tumor outline (case-insensitive).
    pub tumor_label: String,

    /// Label identifying the tissue outline (case-insensitive).
    pub tissue_label: String,

    /// Label identifying candidate regions (case-insensitive).
    pub candidate_label: String,

    /// Display name and color for each created zone annotation.
    pub zone_styles: ZoneMap<ZoneStyle>,

    /// Label applied to a candidate region classified into each zone.
    pub candidate_labels: ZoneMap<String>,

    /// Handling of duplicate tumor/tissue annotations.
    pub duplicate_policy: DuplicatePolicy,

    /// Handling of candidate regions outside every zone.
    pub no_overlap_policy: NoOverlapPolicy,

    /// Relative difference between the two axis calibrations above which
    /// a mismatch warning is logged.
    pub calibration_tolerance: f64,
}

impl ZoningConfig {
    /// Default margin band width in physical units.
    pub const DEFAULT_MARGIN_DISTANCE: f64 = 500.0;

    /// Default relative tolerance for pixel width/height mismatch.
    pub const DEFAULT_CALIBRATION_TOLERANCE: f64 = 1e-4;

    /// Default tumor label.
    pub const DEFAULT_TUMOR_LABEL: &str = "Tumor";

    /// Default tissue label.
    pub const DEFAULT_TISSUE_LABEL: &str = "Tissue";

    /// Default candidate label.
    pub const DEFAULT_CANDIDATE_LABEL: &str = "TLS";

    /// Check the invariants the pipeline relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ZoningError::InvalidConfig`] when the margin distance is
    /// negative or non-finite, the calibration tolerance is not a positive
    /// finite number, or any of the matching labels is blank.
    pub fn validate(&self) -> Result<(), ZoningError> {
        if !self.margin_distance.is_finite() || self.margin_distance < 0.0 {
            return Err(ZoningError::InvalidConfig(format!(
                "margin distance must be finite and non-negative, got {}",
                self.margin_distance
            )));
        }
        if !self.calibration_tolerance.is_finite() || self.calibration_tolerance <= 0.0 {
            return Err(ZoningError::InvalidConfig(format!(
                "calibration tolerance must be finite and positive, got {}",
                self.calibration_tolerance
            )));
        }
        for (what, label) in [
            ("tumor", &self.tumor_label),
            ("tissue", &self.tissue_label),
            ("candidate", &self.candidate_label),
        ] {
            if label.trim().is_empty() {
                return Err(ZoningError::InvalidConfig(format!(
                    "{what} label must not be blank"
                )));
            }
        }
        if crate::resolve::label_matches(Some(&self.tumor_label), &self.tissue_label) {
            return Err(ZoningError::InvalidConfig(format!(
                "tumor and tissue labels must differ, both are {:?}",
                self.tumor_label
            )));
        }
        Ok(())
    }
}

impl Default for ZoningConfig {
    fn default() -> Self {
        Self {
            margin_distance: Self::DEFAULT_MARGIN_DISTANCE,
            lock_new_annotations: true,
            remove_source_annotations: true,
            tumor_label: Self::DEFAULT_TUMOR_LABEL.to_owned(),
            tissue_label: Self::DEFAULT_TISSUE_LABEL.to_owned(),
            candidate_label: Self::DEFAULT_CANDIDATE_LABEL.to_owned(),
            zone_styles: ZoneMap {
                center: ZoneStyle::new("Center", Rgb::new(200, 30, 30)),
                inner_margin: ZoneStyle::new("Inner Margin", Rgb::new(240, 140, 20)),
                outer_margin: ZoneStyle::new("Outer Margin", Rgb::new(230, 210, 40)),
                stroma: ZoneStyle::new("Stroma", Rgb::new(60, 150, 60)),
            },
            candidate_labels: ZoneMap::from_fn(|zone| match zone {
                Zone::Center => "TLS Center".to_owned(),
                Zone::InnerMargin => "TLS Inner Margin".to_owned(),
                Zone::OuterMargin => "TLS Outer Margin".to_owned(),
                Zone::Stroma => "TLS Stroma".to_owned(),
            }),
            duplicate_policy: DuplicatePolicy::default(),
            no_overlap_policy: NoOverlapPolicy::default(),
            calibration_tolerance: Self::DEFAULT_CALIBRATION_TOLERANCE,
        }
    }
}

/// Errors that abort a zoning invocation.
///
/// Every variant is fatal for the current image: nothing is written to
/// the host. Batch drivers may skip the image and continue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ZoningError {
    /// The host has no usable physical pixel size.
    #[error("image has no pixel calibration; margin distance cannot be converted")]
    MissingCalibration,

    /// Fewer than two annotations exist, so tumor and tissue cannot both
    /// be present.
    #[error("need at least 2 annotations (tumor and tissue), found {found}")]
    InsufficientAnnotations {
        /// Number of annotations the host listed.
        found: usize,
    },

    /// No annotation carries the tumor label.
    #[error("no annotation labeled as tumor")]
    MissingTumorAnnotation,

    /// No annotation carries the tissue label.
    #[error("no annotation labeled as tissue")]
    MissingTissueAnnotation,

    /// More than one annotation carries a label that must be unique.
    #[error("{count} annotations labeled {label:?}, expected exactly one")]
    DuplicateAnnotation {
        /// The duplicated label.
        label: String,
        /// How many annotations carry it.
        count: usize,
    },

    /// An annotation's geometry cannot be used as an area.
    #[error("annotation {id} has invalid geometry: {reason}")]
    InvalidGeometry {
        /// The offending annotation.
        id: AnnotationId,
        /// Why it was rejected.
        reason: String,
    },

    /// Configuration is invalid.
    #[error("invalid zoning configuration: {0}")]
    InvalidConfig(String),
}
