//! Pixel calibration: converting physical lengths into geometry units.
//!
//! Hosts report the physical size of one pixel along each axis. Zoning
//! needs a single scalar, so the two axes are averaged. Anisotropic
//! pixels are unusual enough to deserve a warning but not an abort.

use serde::{Deserialize, Serialize};

use crate::types::ZoningError;

/// Physical size of one pixel along each axis, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelCalibration {
    /// Physical width of one pixel (e.g. micrometers).
    pub pixel_width: f64,
    /// Physical height of one pixel (e.g. micrometers).
    pub pixel_height: f64,
}

impl PixelCalibration {
    /// Create a calibration from per-axis pixel sizes.
    #[must_use]
    pub const fn new(pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            pixel_width,
            pixel_height,
        }
    }

    /// Same pixel size along both axes.
    #[must_use]
    pub const fn isotropic(pixel_size: f64) -> Self {
        Self::new(pixel_size, pixel_size)
    }

    /// Relative difference between the two axes, `|w - h| / max(w, h)`.
    #[must_use]
    pub fn relative_mismatch(&self) -> f64 {
        let larger = self.pixel_width.max(self.pixel_height);
        if larger <= 0.0 {
            return 0.0;
        }
        (self.pixel_width - self.pixel_height).abs() / larger
    }

    /// Whether the two axes differ by more than `tolerance`, relative to
    /// the larger one.
    #[must_use]
    pub fn is_anisotropic(&self, tolerance: f64) -> bool {
        self.relative_mismatch() > tolerance
    }

    /// Reduce to a single [`CalibrationFactor`].
    ///
    /// A mismatch larger than `tolerance` is logged and the arithmetic mean
    /// is used regardless.
    ///
    /// # Errors
    ///
    /// Returns [`ZoningError::MissingCalibration`] if either axis is not a
    /// positive finite number. Hosts without calibration often report
    /// `NaN` rather than nothing.
    pub fn factor(&self, tolerance: f64) -> Result<CalibrationFactor, ZoningError> {
        let usable = |v: f64| v.is_finite() && v > 0.0;
        if !usable(self.pixel_width) || !usable(self.pixel_height) {
            return Err(ZoningError::MissingCalibration);
        }

        if self.is_anisotropic(tolerance) {
            log::warn!(
                "pixel width {} and height {} differ (relative {:.2e}); using their average",
                self.pixel_width,
                self.pixel_height,
                self.relative_mismatch(),
            );
        }

        Ok(CalibrationFactor(f64::midpoint(
            self.pixel_width,
            self.pixel_height,
        )))
    }
}

/// Physical length per geometry unit. Always positive and finite.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalibrationFactor(f64);

impl CalibrationFactor {
    /// The raw physical-length-per-unit value.
    #[must_use]
    pub const fn get(self) -> f64 {
        self.0
    }

    /// Convert a physical length into geometry units.
    #[must_use]
    pub fn to_geometry_units(self, physical: f64) -> f64 {
        physical / self.0
    }
}
