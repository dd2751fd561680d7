//! Compute layer for the region store.
//!
//! Geometry primitives, coordinate validation and dataset parsing live here,
//! separate from the store and index that use them.

pub mod geojson;
pub mod geometry;
pub mod validation;

pub use geometry::{polygon_bounding_box, polygon_contains, ring_contains};
