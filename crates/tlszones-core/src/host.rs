//! The annotation host: the only collaborator zoning reads from and
//! writes to.
//!
//! A host is whatever owns the live annotation set of one image (a slide
//! viewer, a document on disk, a test fixture). The pipeline receives it
//! as a parameter; it is never reached through global state.
//!
//! [`InMemoryHost`] is a complete host backed by a `Vec`. It doubles as
//! the serde document format read and written by the CLI.

use std::collections::BTreeSet;

use geo::{Geometry, MultiPolygon};
use serde::{Deserialize, Serialize};

use crate::calibration::PixelCalibration;
use crate::types::{AnnotationId, Rgb};

/// One annotation as enumerated by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Stable identity within the host.
    pub id: AnnotationId,
    /// Classification label, if the annotation has one.
    pub label: Option<String>,
    /// The annotation's outline.
    pub geometry: Geometry<f64>,
}

/// An annotation to be created by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnnotation {
    /// Outline of the new annotation.
    pub geometry: MultiPolygon<f64>,
    /// Display name shown by the host.
    pub name: String,
    /// Display color.
    pub color: Rgb,
    /// Whether the annotation is locked against editing.
    pub locked: bool,
}

/// Read/write access to the annotation set of one image.
///
/// Mutating methods are infallible: the pipeline validates everything it
/// needs before the first write, so a host never sees a partial result.
pub trait AnnotationHost {
    /// Every annotation, in the host's enumeration order.
    fn list_annotations(&self) -> Vec<Annotation>;

    /// Physical pixel size, or `None` when the image is uncalibrated.
    fn calibration(&self) -> Option<PixelCalibration>;

    /// Remove an annotation. Unknown identities are ignored.
    fn remove_annotation(&mut self, id: AnnotationId);

    /// Create an annotation and return its identity.
    fn add_annotation(&mut self, annotation: NewAnnotation) -> AnnotationId;

    /// Set (or replace) the classification label of an annotation.
    /// Unknown identities are ignored.
    fn set_annotation_label(&mut self, id: AnnotationId, label: &str);

    /// Signal that a batch of changes is complete.
    fn notify_changed(&mut self);
}

/// An annotation as stored by [`InMemoryHost`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAnnotation {
    /// Stable identity.
    pub id: AnnotationId,
    /// Classification label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Display color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgb>,
    /// Whether the annotation is locked.
    #[serde(default)]
    pub locked: bool,
    /// Outline.
    pub geometry: Geometry<f64>,
}

/// A host keeping annotations in memory.
///
/// Identities are assigned as one more than the largest identity present,
/// so a deserialized document can be extended without collisions. Once
/// `u64::MAX` is taken, the smallest unused identity is handed out instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryHost {
    /// Pixel calibration of the image, if known.
    #[serde(default)]
    pub calibration: Option<PixelCalibration>,
    /// Annotations in enumeration order.
    #[serde(default)]
    pub annotations: Vec<StoredAnnotation>,
    /// Number of [`AnnotationHost::notify_changed`] calls received.
    #[serde(skip)]
    change_notifications: usize,
}

impl InMemoryHost {
    /// An empty host with the given calibration.
    #[must_use]
    pub const fn new(calibration: Option<PixelCalibration>) -> Self {
        Self {
            calibration,
            annotations: Vec::new(),
            change_notifications: 0,
        }
    }

    /// Add an unstyled annotation with an optional label, returning its
    /// identity. Used to seed a host before zoning.
    pub fn insert(&mut self, label: Option<&str>, geometry: impl Into<Geometry<f64>>) -> AnnotationId {
        let id = self.next_id();
        self.annotations.push(StoredAnnotation {
            id,
            label: label.map(str::to_owned),
            name: None,
            color: None,
            locked: false,
            geometry: geometry.into(),
        });
        id
    }

    /// Look up a stored annotation.
    #[must_use]
    pub fn get(&self, id: AnnotationId) -> Option<&StoredAnnotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    /// How many times the host was notified of changes.
    #[must_use]
    pub const fn change_notifications(&self) -> usize {
        self.change_notifications
    }

    fn next_id(&self) -> AnnotationId {
        let Some(largest) = self.annotations.iter().map(|a| a.id.0).max() else {
            return AnnotationId(0);
        };
        largest
            .checked_add(1)
            .map_or_else(|| self.smallest_unused_id(), AnnotationId)
    }

    /// First gap in the identities in use, for documents that already hold
    /// `u64::MAX`.
    fn smallest_unused_id(&self) -> AnnotationId {
        let used: BTreeSet<u64> = self.annotations.iter().map(|a| a.id.0).collect();
        let mut candidate = 0;
        for id in used {
            if id != candidate {
                break;
            }
            candidate += 1;
        }
        AnnotationId(candidate)
    }

    fn get_mut(&mut self, id: AnnotationId) -> Option<&mut StoredAnnotation> {
        self.annotations.iter_mut().find(|a| a.id == id)
    }
}

impl AnnotationHost for InMemoryHost {
    fn list_annotations(&self) -> Vec<Annotation> {
        self.annotations
            .iter()
            .map(|a| Annotation {
                id: a.id,
                label: a.label.clone(),
                geometry: a.geometry.clone(),
            })
            .collect()
    }

    fn calibration(&self) -> Option<PixelCalibration> {
        self.calibration
    }

    fn remove_annotation(&mut self, id: AnnotationId) {
        self.annotations.retain(|a| a.id != id);
    }

    fn add_annotation(&mut self, annotation: NewAnnotation) -> AnnotationId {
        let id = self.next_id();
        self.annotations.push(StoredAnnotation {
            id,
            label: None,
            name: Some(annotation.name),
            color: Some(annotation.color),
            locked: annotation.locked,
            geometry: Geometry::MultiPolygon(annotation.geometry),
        });
        id
    }

    fn set_annotation_label(&mut self, id: AnnotationId, label: &str) {
        if let Some(a) = self.get_mut(id) {
            a.label = Some(label.to_owned());
        }
    }

    fn notify_changed(&mut self) {
        self.change_notifications += 1;
    }
}
