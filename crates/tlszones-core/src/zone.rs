//! The four margin zones and a fixed-size map keyed by them.
//!
//! [`ZoneMap`] is used for everything that comes "one per zone": the zone
//! geometries themselves ([`ZoneSet`]), overlap areas ([`ZoneAreas`]),
//! display styles and classification labels.

use std::fmt;

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

/// One of the four disjoint regions partitioning the tissue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zone {
    /// Tumor interior, eroded by the margin distance.
    Center,
    /// Band of width `margin` just inside the tumor boundary.
    InnerMargin,
    /// Band of width `margin` just outside the tumor boundary.
    OuterMargin,
    /// Remaining tissue.
    Stroma,
}

impl Zone {
    /// All zones in geometric order, from the tumor core outwards.
    pub const ALL: [Self; 4] = [
        Self::Center,
        Self::InnerMargin,
        Self::OuterMargin,
        Self::Stroma,
    ];

    /// Order in which exact overlap ties are resolved. The first zone in
    /// this list wins a tie.
    pub const TIE_BREAK_PRIORITY: [Self; 4] = [
        Self::Center,
        Self::InnerMargin,
        Self::Stroma,
        Self::OuterMargin,
    ];

    /// Short machine-friendly name (`center`, `inner-margin`, ...).
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::InnerMargin => "inner-margin",
            Self::OuterMargin => "outer-margin",
            Self::Stroma => "stroma",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Center => "Center",
            Self::InnerMargin => "Inner margin",
            Self::OuterMargin => "Outer margin",
            Self::Stroma => "Stroma",
        };
        f.write_str(name)
    }
}

/// One value per [`Zone`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneMap<T> {
    /// Value for [`Zone::Center`].
    pub center: T,
    /// Value for [`Zone::InnerMargin`].
    pub inner_margin: T,
    /// Value for [`Zone::OuterMargin`].
    pub outer_margin: T,
    /// Value for [`Zone::Stroma`].
    pub stroma: T,
}

impl<T> ZoneMap<T> {
    /// Build a map by evaluating `f` once per zone, in [`Zone::ALL`] order.
    pub fn from_fn(mut f: impl FnMut(Zone) -> T) -> Self {
        Self {
            center: f(Zone::Center),
            inner_margin: f(Zone::InnerMargin),
            outer_margin: f(Zone::OuterMargin),
            stroma: f(Zone::Stroma),
        }
    }

    /// The value for `zone`.
    #[must_use]
    pub const fn get(&self, zone: Zone) -> &T {
        match zone {
            Zone::Center => &self.center,
            Zone::InnerMargin => &self.inner_margin,
            Zone::OuterMargin => &self.outer_margin,
            Zone::Stroma => &self.stroma,
        }
    }

    /// Mutable access to the value for `zone`.
    pub const fn get_mut(&mut self, zone: Zone) -> &mut T {
        match zone {
            Zone::Center => &mut self.center,
            Zone::InnerMargin => &mut self.inner_margin,
            Zone::OuterMargin => &mut self.outer_margin,
            Zone::Stroma => &mut self.stroma,
        }
    }

    /// Iterate `(zone, value)` pairs in [`Zone::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Zone, &T)> {
        Zone::ALL.into_iter().map(move |zone| (zone, self.get(zone)))
    }

    /// Apply `f` to every value, keeping the zone association.
    pub fn map<U>(&self, mut f: impl FnMut(Zone, &T) -> U) -> ZoneMap<U> {
        ZoneMap::from_fn(|zone| f(zone, self.get(zone)))
    }
}

/// The four zone geometries produced by [`build_zones`](crate::zones::build_zones).
pub type ZoneSet = ZoneMap<MultiPolygon<f64>>;

/// Per-zone area, in squared geometry units.
pub type ZoneAreas = ZoneMap<f64>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tie_break_priority_is_a_permutation_of_all() {
        let mut priority = Zone::TIE_BREAK_PRIORITY.to_vec();
        let mut all = Zone::ALL.to_vec();
        priority.sort_by_key(|z| z.slug());
        all.sort_by_key(|z| z.slug());
        assert_eq!(priority, all);
    }

    #[test]
    fn stroma_outranks_outer_margin_on_ties() {
        let rank = |zone: Zone| {
            Zone::TIE_BREAK_PRIORITY
                .iter()
                .position(|z| *z == zone)
                .unwrap_or(usize::MAX)
        };
        assert!(rank(Zone::Center) < rank(Zone::InnerMargin));
        assert!(rank(Zone::InnerMargin) < rank(Zone::Stroma));
        assert!(rank(Zone::Stroma) < rank(Zone::OuterMargin));
    }

    #[test]
    fn zone_map_get_matches_fields() {
        let map = ZoneMap::from_fn(|zone| zone.slug());
        assert_eq!(*map.get(Zone::Center), "center");
        assert_eq!(*map.get(Zone::InnerMargin), "inner-margin");
        assert_eq!(*map.get(Zone::OuterMargin), "outer-margin");
        assert_eq!(*map.get(Zone::Stroma), "stroma");
    }

    #[test]
    fn zone_map_iter_follows_geometric_order() {
        let map = ZoneMap::from_fn(|zone| zone);
        let order: Vec<Zone> = map.iter().map(|(zone, _)| zone).collect();
        assert_eq!(order, Zone::ALL.to_vec());
    }

    #[test]
    fn zone_map_get_mut_updates_single_entry() {
        let mut areas = ZoneAreas::default();
        *areas.get_mut(Zone::Stroma) = 12.5;
        assert!((areas.stroma - 12.5).abs() < f64::EPSILON);
        assert!(areas.center.abs() < f64::EPSILON);
    }

    #[test]
    fn display_names() {
        assert_eq!(Zone::Center.to_string(), "Center");
        assert_eq!(Zone::OuterMargin.to_string(), "Outer margin");
    }
}
