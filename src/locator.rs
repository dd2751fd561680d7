//! Point location against a built [`RegionStore`].
//!
//! A lookup is two-phase: the R*-tree narrows the store to regions whose
//! bounding box contains the point, then each candidate gets an exact
//! point-in-polygon test in load order. The first exact hit wins.
//!
//! # Overlapping regions
//!
//! Regions are assumed not to overlap. If a dataset does contain overlaps,
//! the region loaded first (by position in the source) is returned. This is a
//! fixed policy, not an error.

use crate::compute::validation::is_geographic;
use crate::store::RegionStore;
use geo::Point;
use geotract_types::region::RegionId;
use serde::Serialize;

/// Outcome of a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "status", content = "region", rename_all = "snake_case")]
pub enum Location {
    Found(RegionId),
    NotFound,
}

impl Location {
    pub fn is_found(&self) -> bool {
        matches!(self, Location::Found(_))
    }

    pub fn region_id(&self) -> Option<&RegionId> {
        match self {
            Location::Found(id) => Some(id),
            Location::NotFound => None,
        }
    }

    pub fn into_option(self) -> Option<RegionId> {
        match self {
            Location::Found(id) => Some(id),
            Location::NotFound => None,
        }
    }
}

impl From<Option<RegionId>> for Location {
    fn from(id: Option<RegionId>) -> Self {
        id.map_or(Location::NotFound, Location::Found)
    }
}

/// Work done by a single lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueryTrace {
    /// Regions whose bounding box contained the point
    pub candidates: usize,
    /// Exact point-in-polygon tests run before an answer was reached
    pub exact_tests: usize,
}

/// Stateless locator. All state lives in the [`RegionStore`] it is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointLocator;

impl PointLocator {
    /// Returns the region containing `point`, or [`Location::NotFound`].
    ///
    /// Never fails: non-finite or out-of-range coordinates simply yield
    /// `NotFound`. Points on an edge shared by two regions resolve to the same
    /// one of them on every call (see [`crate::compute::geometry`]).
    ///
    /// # Examples
    ///
    /// ```
    /// use geotract::{Location, PointLocator, RegionFeature, RegionStore, StoreConfig};
    /// use geo::{Point, polygon};
    ///
    /// let store = RegionStore::from_features(
    ///     vec![RegionFeature::polygon(
    ///         "A",
    ///         polygon![(x: 0.0, y: 0.0), (x: 0.0, y: 10.0), (x: 10.0, y: 10.0), (x: 10.0, y: 0.0)],
    ///     )],
    ///     &StoreConfig::default(),
    /// )?;
    ///
    /// assert_eq!(PointLocator::locate(&store, &Point::new(5.0, 5.0)), Location::Found("A".into()));
    /// assert_eq!(PointLocator::locate(&store, &Point::new(15.0, 15.0)), Location::NotFound);
    /// # Ok::<(), geotract::LoadError>(())
    /// ```
    pub fn locate(store: &RegionStore, point: &Point<f64>) -> Location {
        Self::locate_traced(store, point).0
    }

    /// Like [`locate`](Self::locate), taking longitude and latitude directly.
    pub fn locate_lng_lat(store: &RegionStore, lng: f64, lat: f64) -> Location {
        Self::locate(store, &Point::new(lng, lat))
    }

    /// Like [`locate`](Self::locate), also reporting how much work was done.
    pub fn locate_traced(store: &RegionStore, point: &Point<f64>) -> (Location, QueryTrace) {
        let mut trace = QueryTrace::default();

        if !is_geographic(point) {
            return (Location::NotFound, trace);
        }

        let candidates = store.candidates(point);
        trace.candidates = candidates.len();

        let regions = store.regions();
        for slot in candidates {
            let region = &regions[slot];
            trace.exact_tests += 1;
            if region.contains(point) {
                return (Location::Found(region.id().clone()), trace);
            }
        }

        (Location::NotFound, trace)
    }
}
