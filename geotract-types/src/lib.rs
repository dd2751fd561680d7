//! # geotract-types
//!
//! Plain value types shared by the geotract region store and its collaborators:
//!
//! - **Bounding boxes**: `BoundingBox2D`
//! - **Identifiers**: `RegionId`
//! - **Load reporting**: `LoadStats`
//!
//! All types are serializable with Serde and built on top of the `geo` crate's
//! geometric primitives.
//!
//! ## Examples
//!
//! ```rust
//! use geotract_types::bbox::BoundingBox2D;
//! use geotract_types::region::RegionId;
//! use geo::Point;
//!
//! let tract = BoundingBox2D::new(-46.64, -23.56, -46.62, -23.54);
//! assert!(tract.contains_point(&Point::new(-46.63, -23.55)));
//!
//! let id = RegionId::from("355030801000001");
//! assert_eq!(id.as_str(), "355030801000001");
//! ```

pub mod bbox;
pub mod region;
pub mod stats;
