//! R*-tree index over region bounding boxes.
//!
//! The index is bulk-loaded once and never mutated. A lookup returns the
//! slots of every region whose bounding box contains the query point, in
//! ascending slot order, so callers can apply first-match-by-load-order.

use geo::Point;
use geotract_types::bbox::BoundingBox2D;
use rstar::{AABB, RTree};
use smallvec::SmallVec;

/// Candidate slots for one lookup. Tracts rarely overlap by bounding box more
/// than a handful deep.
pub type Candidates = SmallVec<[usize; 8]>;

/// Bounding box entry for the R*-tree, pointing back at a region slot.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedBBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub slot: usize,
}

impl IndexedBBox {
    pub fn new(slot: usize, bbox: &BoundingBox2D) -> Self {
        Self {
            min_x: bbox.min_x(),
            min_y: bbox.min_y(),
            max_x: bbox.max_x(),
            max_y: bbox.max_y(),
            slot,
        }
    }
}

impl rstar::RTreeObject for IndexedBBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.min_x, self.min_y], [self.max_x, self.max_y])
    }
}

/// Immutable spatial index mapping a point to candidate region slots.
#[derive(Debug)]
pub struct RegionIndex {
    tree: RTree<IndexedBBox>,
}

impl RegionIndex {
    /// Bulk-loads the tree from `(slot, bbox)` pairs.
    pub fn build<'a>(boxes: impl IntoIterator<Item = (usize, &'a BoundingBox2D)>) -> Self {
        let entries = boxes
            .into_iter()
            .map(|(slot, bbox)| IndexedBBox::new(slot, bbox))
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Slots whose bounding box contains `point` (edges inclusive), ascending.
    ///
    /// Returns no candidates for non-finite coordinates.
    pub fn candidates(&self, point: &Point<f64>) -> Candidates {
        let (x, y) = (point.x(), point.y());
        if !x.is_finite() || !y.is_finite() {
            return Candidates::new();
        }

        let probe = AABB::from_point([x, y]);
        let mut slots: Candidates = self
            .tree
            .locate_in_envelope_intersecting(&probe)
            .map(|entry| entry.slot)
            .collect();
        slots.sort_unstable();
        slots
    }
}
