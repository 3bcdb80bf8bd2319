//! Region classification: assign each candidate region to the zone it
//! overlaps the most.
//!
//! Exact ties are resolved by walking [`Zone::TIE_BREAK_PRIORITY`] and
//! keeping the first zone with the maximal overlap, so the result never
//! depends on iteration order of anything else. Ties are also reported in
//! [`RegionClassification::tied`] so callers can review them.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use geo::{Area, BooleanOps, MultiPolygon};
use serde::{Deserialize, Serialize};

use crate::resolve::CandidateRegion;
use crate::types::{AnnotationId, NoOverlapPolicy};
use crate::zone::{Zone, ZoneAreas, ZoneMap, ZoneSet};

/// The outcome for one candidate region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assignment {
    /// The region belongs to this zone.
    Zone(Zone),
    /// The region overlaps none of the zones (it lies outside the tissue).
    NoOverlap,
}

impl Assignment {
    /// The assigned zone, if any.
    #[must_use]
    pub const fn zone(self) -> Option<Zone> {
        match self {
            Self::Zone(zone) => Some(zone),
            Self::NoOverlap => None,
        }
    }
}

/// Classification of one candidate region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionClassification {
    /// The candidate's annotation identity.
    pub id: AnnotationId,
    /// Where the region was assigned.
    pub assignment: Assignment,
    /// Intersection area with every zone.
    pub overlaps: ZoneAreas,
    /// Zones sharing the maximal overlap, in tie-break order. Empty unless
    /// two or more zones tied.
    pub tied: Vec<Zone>,
}

/// Classification of every candidate, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    regions: Vec<RegionClassification>,
}

impl Classification {
    /// Per-region results, in candidate order.
    #[must_use]
    pub fn regions(&self) -> &[RegionClassification] {
        &self.regions
    }

    /// Number of classified candidates.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.regions.len()
    }

    /// Returns `true` if there were no candidates.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// The assignment of a single candidate.
    #[must_use]
    pub fn get(&self, id: AnnotationId) -> Option<Assignment> {
        self.regions
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.assignment)
    }

    /// Identity → assignment mapping.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<AnnotationId, Assignment> {
        self.regions.iter().map(|r| (r.id, r.assignment)).collect()
    }

    /// How many candidates went to each zone.
    #[must_use]
    pub fn zone_counts(&self) -> ZoneMap<usize> {
        let mut counts = ZoneMap::<usize>::default();
        for zone in self.regions.iter().filter_map(|r| r.assignment.zone()) {
            *counts.get_mut(zone) += 1;
        }
        counts
    }

    /// Number of candidates without overlap.
    #[must_use]
    pub fn no_overlap_count(&self) -> usize {
        self.regions
            .iter()
            .filter(|r| r.assignment == Assignment::NoOverlap)
            .count()
    }

    /// Number of candidates whose maximal overlap was tied.
    #[must_use]
    pub fn tie_count(&self) -> usize {
        self.regions.iter().filter(|r| !r.tied.is_empty()).count()
    }
}

/// Intersection area of `region` with each zone.
#[must_use]
pub fn overlap_areas(region: &MultiPolygon<f64>, zones: &ZoneSet) -> ZoneAreas {
    zones.map(|_, zone| region.intersection(zone).unsigned_area())
}

/// Pick the zone with the strictly largest overlap.
///
/// Returns the assignment and the list of tied zones (empty when the
/// maximum is unique or when nothing overlaps).
#[must_use]
pub fn pick_zone(overlaps: &ZoneAreas, policy: NoOverlapPolicy) -> (Assignment, Vec<Zone>) {
    let [first, rest @ ..] = Zone::TIE_BREAK_PRIORITY;
    let mut best = first;
    let mut best_area = *overlaps.get(first);
    for zone in rest {
        let area = *overlaps.get(zone);
        if area.total_cmp(&best_area) == Ordering::Greater {
            best = zone;
            best_area = area;
        }
    }

    if best_area <= 0.0 {
        return match policy {
            NoOverlapPolicy::Unclassified => (Assignment::NoOverlap, Vec::new()),
            NoOverlapPolicy::PriorityFallback => (Assignment::Zone(best), Vec::new()),
        };
    }

    let tied: Vec<Zone> = Zone::TIE_BREAK_PRIORITY
        .into_iter()
        .filter(|zone| overlaps.get(*zone).total_cmp(&best_area) == Ordering::Equal)
        .collect();
    let tied = if tied.len() > 1 { tied } else { Vec::new() };
    (Assignment::Zone(best), tied)
}

/// Classify every candidate against the zones.
///
/// Neither the zones nor the candidates are modified.
#[must_use]
pub fn classify(
    candidates: &[CandidateRegion],
    zones: &ZoneSet,
    policy: NoOverlapPolicy,
) -> Classification {
    let regions = candidates
        .iter()
        .map(|candidate| {
            let overlaps = overlap_areas(&candidate.geometry, zones);
            let (assignment, tied) = pick_zone(&overlaps, policy);
            match assignment {
                Assignment::NoOverlap => {
                    log::warn!("candidate {} overlaps no zone; leaving it unclassified", candidate.id);
                }
                Assignment::Zone(zone) if !tied.is_empty() => {
                    log::warn!(
                        "candidate {} overlaps {tied:?} equally; assigned to {zone}",
                        candidate.id,
                    );
                }
                Assignment::Zone(_) => {}
            }
            RegionClassification {
                id: candidate.id,
                assignment,
                overlaps,
                tied,
            }
        })
        .collect();
    Classification { regions }
}
