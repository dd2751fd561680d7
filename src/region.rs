//! Region entities: one census tract polygon part with its identifier.

use crate::compute::geometry::{polygon_bounding_box, polygon_contains};
use geo::{Point, Polygon};
use geotract_types::bbox::BoundingBox2D;
use geotract_types::region::RegionId;

/// One polygon part of a region, with its bounding box cached at load time.
///
/// Multi-polygon features become several `Region` entries that share the same
/// [`RegionId`].
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    id: RegionId,
    boundary: Polygon<f64>,
    bounding_box: BoundingBox2D,
}

impl Region {
    /// Builds a region from its boundary. Returns `None` when the boundary has
    /// no vertices and therefore no bounding box.
    pub fn new(id: RegionId, boundary: Polygon<f64>) -> Option<Self> {
        let bounding_box = polygon_bounding_box(&boundary)?;
        Some(Self {
            id,
            boundary,
            bounding_box,
        })
    }

    pub fn id(&self) -> &RegionId {
        &self.id
    }

    pub fn boundary(&self) -> &Polygon<f64> {
        &self.boundary
    }

    pub fn bounding_box(&self) -> &BoundingBox2D {
        &self.bounding_box
    }

    /// Exact containment: inside the outer ring and outside every hole.
    pub fn contains(&self, point: &Point<f64>) -> bool {
        self.bounding_box.contains_point(point) && polygon_contains(&self.boundary, point)
    }
}

/// A feature as read from a geometry source, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionFeature {
    pub id: RegionId,
    pub polygons: Vec<Polygon<f64>>,
}

impl RegionFeature {
    pub fn new(id: impl Into<RegionId>, polygons: Vec<Polygon<f64>>) -> Self {
        Self {
            id: id.into(),
            polygons,
        }
    }

    pub fn polygon(id: impl Into<RegionId>, polygon: Polygon<f64>) -> Self {
        Self::new(id, vec![polygon])
    }
}
