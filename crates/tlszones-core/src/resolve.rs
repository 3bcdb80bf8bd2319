//! Input resolution: pick the tumor, tissue and candidate geometries out
//! of the host's annotation set and work out the margin in geometry units.
//!
//! This is a pure read of the host; nothing is modified.

use geo::MultiPolygon;

use crate::calibration::CalibrationFactor;
use crate::geometry;
use crate::host::{Annotation, AnnotationHost};
use crate::types::{AnnotationId, DuplicatePolicy, ZoningConfig, ZoningError};

/// A candidate region (TLS) to be classified.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRegion {
    /// Identity of the candidate's annotation in the host.
    pub id: AnnotationId,
    /// The candidate's area.
    pub geometry: MultiPolygon<f64>,
}

/// Everything the zone builder and classifier need, read from the host.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInput {
    /// Identity of the tumor annotation.
    pub tumor_id: AnnotationId,
    /// Tumor outline.
    pub tumor: MultiPolygon<f64>,
    /// Identity of the tissue annotation.
    pub tissue_id: AnnotationId,
    /// Tissue outline.
    pub tissue: MultiPolygon<f64>,
    /// Candidate regions, in host enumeration order.
    pub candidates: Vec<CandidateRegion>,
    /// Physical length per geometry unit.
    pub calibration: CalibrationFactor,
    /// Whether pixel width and height disagreed beyond the configured
    /// tolerance. The averaged factor is used either way.
    pub anisotropic: bool,
    /// Margin distance converted to geometry units.
    pub margin: f64,
    /// Total number of annotations the host listed.
    pub annotation_count: usize,
}

/// Case-insensitive exact label match. Surrounding whitespace on the
/// annotation's label is ignored.
#[must_use]
pub fn label_matches(label: Option<&str>, wanted: &str) -> bool {
    label.is_some_and(|l| l.trim().to_lowercase() == wanted.trim().to_lowercase())
}

/// Read tumor, tissue, candidates and calibration from `host`.
///
/// Checks run in a fixed order: configuration, calibration, annotation
/// count, tumor, tissue, then geometry validity.
///
/// # Errors
///
/// - [`ZoningError::InvalidConfig`] if `config` fails validation.
/// - [`ZoningError::MissingCalibration`] if the host has no usable pixel size.
/// - [`ZoningError::InsufficientAnnotations`] if fewer than two annotations exist.
/// - [`ZoningError::MissingTumorAnnotation`] / [`ZoningError::MissingTissueAnnotation`]
///   if the respective label is absent.
/// - [`ZoningError::DuplicateAnnotation`] if a unique label is repeated and
///   the duplicate policy is [`DuplicatePolicy::Reject`].
/// - [`ZoningError::InvalidGeometry`] if the tumor, tissue or any candidate
///   geometry is not a finite area.
pub fn resolve<H: AnnotationHost + ?Sized>(
    host: &H,
    config: &ZoningConfig,
) -> Result<ResolvedInput, ZoningError> {
    config.validate()?;

    let pixel_size = host.calibration().ok_or(ZoningError::MissingCalibration)?;
    let calibration = pixel_size.factor(config.calibration_tolerance)?;
    let anisotropic = pixel_size.is_anisotropic(config.calibration_tolerance);

    let annotations = host.list_annotations();
    if annotations.len() < 2 {
        return Err(ZoningError::InsufficientAnnotations {
            found: annotations.len(),
        });
    }

    let tumor = find_unique(&annotations, &config.tumor_label, config.duplicate_policy)?
        .ok_or(ZoningError::MissingTumorAnnotation)?;
    let tissue = find_unique(&annotations, &config.tissue_label, config.duplicate_policy)?
        .ok_or(ZoningError::MissingTissueAnnotation)?;

    let candidates = annotations
        .iter()
        .filter(|a| label_matches(a.label.as_deref(), &config.candidate_label))
        .map(|a| {
            Ok(CandidateRegion {
                id: a.id,
                geometry: areal(a)?,
            })
        })
        .collect::<Result<Vec<_>, ZoningError>>()?;

    let margin = calibration.to_geometry_units(config.margin_distance);
    log::debug!(
        "resolved tumor {} and tissue {} with {} candidates; margin {} physical = {margin:.3} units",
        tumor.id,
        tissue.id,
        candidates.len(),
        config.margin_distance,
    );

    Ok(ResolvedInput {
        tumor_id: tumor.id,
        tumor: areal(tumor)?,
        tissue_id: tissue.id,
        tissue: areal(tissue)?,
        candidates,
        calibration,
        anisotropic,
        margin,
        annotation_count: annotations.len(),
    })
}

/// Find the single annotation carrying `label`.
///
/// Returns `Ok(None)` when nothing matches.
fn find_unique<'a>(
    annotations: &'a [Annotation],
    label: &str,
    policy: DuplicatePolicy,
) -> Result<Option<&'a Annotation>, ZoningError> {
    let mut matches = annotations
        .iter()
        .filter(|a| label_matches(a.label.as_deref(), label));
    let Some(first) = matches.next() else {
        return Ok(None);
    };
    let extra = matches.count();
    if extra > 0 {
        match policy {
            DuplicatePolicy::Reject => {
                return Err(ZoningError::DuplicateAnnotation {
                    label: label.to_owned(),
                    count: extra + 1,
                });
            }
            DuplicatePolicy::FirstMatch => {
                log::warn!(
                    "{} annotations labeled {label:?}; using the first ({})",
                    extra + 1,
                    first.id,
                );
            }
        }
    }
    Ok(Some(first))
}

fn areal(annotation: &Annotation) -> Result<MultiPolygon<f64>, ZoningError> {
    geometry::to_multi_polygon(&annotation.geometry).map_err(|reason| {
        ZoningError::InvalidGeometry {
            id: annotation.id,
            reason: reason.to_string(),
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use geo::{Rect, coord, point};

    use super::*;
    use crate::calibration::PixelCalibration;
    use crate::host::InMemoryHost;

    fn square(min: f64, max: f64) -> Rect<f64> {
        Rect::new(coord! { x: min, y: min }, coord! { x: max, y: max })
    }

    fn calibrated_host() -> InMemoryHost {
        InMemoryHost::new(Some(PixelCalibration::isotropic(0.5)))
    }

    #[test]
    fn resolves_tumor_tissue_and_candidates() {
        let mut host = calibrated_host();
        let tissue = host.insert(Some("Tissue"), square(0.0, 100.0));
        let tumor = host.insert(Some("Tumor"), square(40.0, 60.0));
        let tls = host.insert(Some("TLS"), square(10.0, 12.0));
        host.insert(Some("Necrosis"), square(70.0, 80.0));
        host.insert(None, square(1.0, 2.0));

        let config = ZoningConfig {
            margin_distance: 5.0,
            ..ZoningConfig::default()
        };
        let input = resolve(&host, &config).unwrap();

        assert_eq!(input.tumor_id, tumor);
        assert_eq!(input.tissue_id, tissue);
        assert_eq!(input.candidates.len(), 1);
        assert_eq!(input.candidates[0].id, tls);
        // 5 physical units at 0.5 per pixel.
        assert!((input.margin - 10.0).abs() < 1e-12);
    }

    fn calibrated_host_with_outlines() -> InMemoryHost {
        let mut host = calibrated_host();
        host.insert(Some("Tissue"), square(0.0, 100.0));
        host.insert(Some("Tumor"), square(40.0, 60.0));
        host
    }

    #[test]
    fn calibration_mismatch_is_reported_not_fatal() {
        let mut host = InMemoryHost::new(Some(PixelCalibration::new(0.5, 0.7)));
        host.insert(Some("Tissue"), square(0.0, 100.0));
        host.insert(Some("Tumor"), square(40.0, 60.0));
        let input = resolve(&host, &ZoningConfig::default()).unwrap();
        assert!(input.anisotropic);
        assert!((input.calibration.get() - 0.6).abs() < 1e-12);

        let input = resolve(&calibrated_host_with_outlines(), &ZoningConfig::default()).unwrap();
        assert!(!input.anisotropic);
    }

    #[test]
    fn labels_match_case_insensitively() {
        let mut host = calibrated_host();
        host.insert(Some("TISSUE"), square(0.0, 100.0));
        host.insert(Some("tumor"), square(40.0, 60.0));
        host.insert(Some("tls"), square(10.0, 12.0));
        let input = resolve(&host, &ZoningConfig::default()).unwrap();
        assert_eq!(input.candidates.len(), 1);
    }

    #[test]
    fn label_match_is_exact_not_prefix() {
        assert!(!label_matches(Some("Tumor bed"), "Tumor"));
        assert!(!label_matches(None, "Tumor"));
        assert!(label_matches(Some(" Tumor "), "tumor"));
    }

    #[test]
    fn missing_calibration_fails_first() {
        let mut host = InMemoryHost::new(None);
        host.insert(Some("Tumor"), square(0.0, 1.0));
        let result = resolve(&host, &ZoningConfig::default());
        assert_eq!(result, Err(ZoningError::MissingCalibration));
    }

    #[test]
    fn fewer_than_two_annotations_fails() {
        let mut host = calibrated_host();
        host.insert(Some("Tumor"), square(0.0, 1.0));
        let result = resolve(&host, &ZoningConfig::default());
        assert_eq!(
            result,
            Err(ZoningError::InsufficientAnnotations { found: 1 })
        );
    }

    #[test]
    fn missing_tumor_fails() {
        let mut host = calibrated_host();
        host.insert(Some("Tissue"), square(0.0, 100.0));
        host.insert(Some("TLS"), square(1.0, 2.0));
        let result = resolve(&host, &ZoningConfig::default());
        assert_eq!(result, Err(ZoningError::MissingTumorAnnotation));
    }

    #[test]
    fn missing_tissue_fails() {
        let mut host = calibrated_host();
        host.insert(Some("Tumor"), square(0.0, 100.0));
        host.insert(Some("TLS"), square(1.0, 2.0));
        let result = resolve(&host, &ZoningConfig::default());
        assert_eq!(result, Err(ZoningError::MissingTissueAnnotation));
    }

    #[test]
    fn duplicate_tumor_is_rejected_by_default() {
        let mut host = calibrated_host();
        host.insert(Some("Tissue"), square(0.0, 100.0));
        host.insert(Some("Tumor"), square(10.0, 20.0));
        host.insert(Some("Tumor"), square(30.0, 40.0));
        let result = resolve(&host, &ZoningConfig::default());
        assert_eq!(
            result,
            Err(ZoningError::DuplicateAnnotation {
                label: "Tumor".to_owned(),
                count: 2,
            })
        );
    }

    #[test]
    fn duplicate_tumor_first_match_uses_first() {
        let mut host = calibrated_host();
        host.insert(Some("Tissue"), square(0.0, 100.0));
        let first = host.insert(Some("Tumor"), square(10.0, 20.0));
        host.insert(Some("Tumor"), square(30.0, 40.0));
        let config = ZoningConfig {
            duplicate_policy: DuplicatePolicy::FirstMatch,
            ..ZoningConfig::default()
        };
        let input = resolve(&host, &config).unwrap();
        assert_eq!(input.tumor_id, first);
    }

    #[test]
    fn point_tumor_is_invalid_geometry() {
        let mut host = calibrated_host();
        host.insert(Some("Tissue"), square(0.0, 100.0));
        let tumor = host.insert(Some("Tumor"), point!(x: 5.0, y: 5.0));
        let result = resolve(&host, &ZoningConfig::default());
        assert!(matches!(
            result,
            Err(ZoningError::InvalidGeometry { id, .. }) if id == tumor
        ));
    }

    #[test]
    fn point_candidate_is_invalid_geometry() {
        let mut host = calibrated_host();
        host.insert(Some("Tissue"), square(0.0, 100.0));
        host.insert(Some("Tumor"), square(40.0, 60.0));
        let tls = host.insert(Some("TLS"), point!(x: 5.0, y: 5.0));
        let result = resolve(&host, &ZoningConfig::default());
        assert!(matches!(
            result,
            Err(ZoningError::InvalidGeometry { id, .. }) if id == tls
        ));
    }

    #[test]
    fn invalid_config_is_reported_before_reading_host() {
        let host = InMemoryHost::new(None);
        let config = ZoningConfig {
            margin_distance: f64::INFINITY,
            ..ZoningConfig::default()
        };
        assert!(matches!(
            resolve(&host, &config),
            Err(ZoningError::InvalidConfig(_))
        ));
    }
}
