//! Exact point-in-polygon tests and bounding box derivation.
//!
//! Containment uses crossing-number ray casting toward +x with a half-open
//! rule: an edge counts when `lo.y <= p.y < hi.y` and `p.x` lies strictly left
//! of the crossing. Every edge is evaluated from its lower endpoint, so a ring
//! and its neighbour sharing the same edge compute the identical crossing.
//! The result is that a point on a shared boundary belongs to exactly one side
//! (the region to its right or above), and repeated queries always agree.

use geo::{BoundingRect, Coord, LineString, Point, Polygon};
use geotract_types::bbox::BoundingBox2D;

/// Tests whether `point` lies inside `ring` under the half-open rule.
///
/// Open rings are treated as closed. Degenerate rings (fewer than three
/// distinct vertices, zero area) contain nothing. Non-finite points are never
/// inside.
pub fn ring_contains(ring: &LineString<f64>, point: Coord<f64>) -> bool {
    let coords = &ring.0;
    if coords.len() < 3 || !point.x.is_finite() || !point.y.is_finite() {
        return false;
    }

    let closing = (!ring.is_closed()).then(|| (coords[coords.len() - 1], coords[0]));

    let mut inside = false;
    for (a, b) in coords
        .windows(2)
        .map(|pair| (pair[0], pair[1]))
        .chain(closing)
    {
        if crosses(a, b, point) {
            inside = !inside;
        }
    }
    inside
}

#[inline]
fn crosses(a: Coord<f64>, b: Coord<f64>, p: Coord<f64>) -> bool {
    let (lo, hi) = if a.y <= b.y { (a, b) } else { (b, a) };

    // Horizontal edges fall out here because lo.y == hi.y.
    if p.y < lo.y || p.y >= hi.y {
        return false;
    }

    let t = (p.y - lo.y) / (hi.y - lo.y);
    let x_cross = lo.x + t * (hi.x - lo.x);
    p.x < x_cross
}

/// Tests containment in a polygon with holes: inside the exterior ring and
/// outside every interior ring.
///
/// Holes use the same half-open rule, so a point on a hole's boundary is
/// classified the same way as it would be for an island region filling that
/// hole, and the two never both claim it.
pub fn polygon_contains(polygon: &Polygon<f64>, point: &Point<f64>) -> bool {
    let p = point.0;
    if !ring_contains(polygon.exterior(), p) {
        return false;
    }
    !polygon
        .interiors()
        .iter()
        .any(|hole| ring_contains(hole, p))
}

/// Axis-aligned bounding box of a polygon's exterior ring.
///
/// Returns `None` for an empty polygon.
pub fn polygon_bounding_box(polygon: &Polygon<f64>) -> Option<BoundingBox2D> {
    polygon
        .exterior()
        .bounding_rect()
        .map(BoundingBox2D::from_rect)
}
