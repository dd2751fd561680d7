//! In-memory census tract locator: resolve a longitude/latitude pair to the
//! region that contains it.
//!
//! ## Features
//! - **Region store**: polygons (with holes, multi-part) loaded once from
//!   GeoJSON into an immutable, lock-free shareable store
//! - **Two-phase lookup**: R*-tree over bounding boxes, then an exact
//!   point-in-polygon test with a fixed half-open tie-break on shared edges
//! - **Skip-and-count loading**: malformed features are logged and counted,
//!   with an optional limit
//! - **HTTP front end** (`server` feature): `/locate`, `/health`
//!
//! ```rust
//! use geotract::{Location, RegionFeature, RegionStore, StoreConfig};
//! use geo::{Point, polygon};
//!
//! let tract = polygon![
//!     (x: 0.0, y: 0.0),
//!     (x: 0.0, y: 10.0),
//!     (x: 10.0, y: 10.0),
//!     (x: 10.0, y: 0.0),
//!     (x: 0.0, y: 0.0),
//! ];
//! let store = RegionStore::from_features(
//!     vec![RegionFeature::polygon("A", tract)],
//!     &StoreConfig::default(),
//! )?;
//!
//! assert_eq!(store.locate(&Point::new(5.0, 5.0)), Location::Found("A".into()));
//! assert_eq!(store.locate(&Point::new(15.0, 15.0)), Location::NotFound);
//! # Ok::<(), geotract::LoadError>(())
//! ```

pub mod builder;
pub mod compute;
pub mod config;
pub mod error;
pub mod index;
pub mod locator;
pub mod region;
pub mod store;

#[cfg(feature = "server")]
pub mod server;

pub use builder::RegionStoreBuilder;
pub use config::StoreConfig;
pub use error::{Error, LoadError, Result};
pub use locator::{Location, PointLocator, QueryTrace};
pub use region::{Region, RegionFeature};
pub use store::{FeatureRecord, GeometrySource, MalformedFeature, RegionStore};

pub use compute::geojson::GeoJsonFile;
pub use compute::validation;

pub use geo::{Point, Polygon};
pub use geotract_types::bbox::BoundingBox2D;
pub use geotract_types::region::RegionId;
pub use geotract_types::stats::LoadStats;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {
    pub use crate::{
        GeoJsonFile, Location, PointLocator, RegionFeature, RegionStore, RegionStoreBuilder,
        StoreConfig,
    };
    pub use crate::{Error, LoadError, Result};
    pub use crate::{Point, Polygon, RegionId};
}
