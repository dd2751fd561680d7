//! The region store: every loaded region plus the spatial index over them.
//!
//! A store is built once, all-or-nothing, and is read-only afterwards. It is
//! `Send + Sync`, so a single instance behind an `Arc` serves any number of
//! concurrent lookups without locking.

use crate::builder::RegionStoreBuilder;
use crate::compute::geojson::GeoJsonFile;
use crate::compute::validation::{validate_polygon, validate_polygon_structure};
use crate::config::StoreConfig;
use crate::error::LoadError;
use crate::index::{Candidates, RegionIndex};
use crate::locator::{Location, PointLocator};
use crate::region::{Region, RegionFeature};
use geo::Point;
use geotract_types::bbox::BoundingBox2D;
use geotract_types::region::RegionId;
use geotract_types::stats::LoadStats;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::fmt;
use std::path::Path;
use std::time::Instant;

/// A feature that could not be turned into a region, with its position in the
/// source dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedFeature {
    pub position: usize,
    pub reason: String,
}

impl fmt::Display for MalformedFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "feature #{}: {}", self.position, self.reason)
    }
}

/// One entry read from a geometry source.
pub type FeatureRecord = std::result::Result<RegionFeature, MalformedFeature>;

/// A dataset the store can be built from.
///
/// Whole-source failures are returned as [`LoadError`]; per-feature problems
/// are returned as `Err` records inside the `Ok` vector so the store can skip
/// and count them.
pub trait GeometrySource {
    /// Human-readable name used in log lines.
    fn describe(&self) -> String;

    fn read_features(&self, config: &StoreConfig) -> Result<Vec<FeatureRecord>, LoadError>;
}

impl GeometrySource for Vec<RegionFeature> {
    fn describe(&self) -> String {
        format!("{} in-memory features", self.len())
    }

    fn read_features(&self, _config: &StoreConfig) -> Result<Vec<FeatureRecord>, LoadError> {
        Ok(self.iter().cloned().map(Ok).collect())
    }
}

/// Immutable collection of regions with a bounding-box R*-tree.
#[derive(Debug)]
pub struct RegionStore {
    regions: Vec<Region>,
    index: RegionIndex,
    by_id: FxHashMap<RegionId, SmallVec<[usize; 2]>>,
    extent: BoundingBox2D,
    stats: LoadStats,
}

impl RegionStore {
    pub fn builder() -> RegionStoreBuilder {
        RegionStoreBuilder::new()
    }

    /// Builds a store from a GeoJSON file with the default configuration.
    pub fn build(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        Self::from_source(&GeoJsonFile::new(path.as_ref()), &StoreConfig::default())
    }

    /// Builds a store from any geometry source.
    ///
    /// Transient I/O failures are retried according to `config.load_retries`.
    /// Malformed features are skipped, counted and logged; the build fails if
    /// nothing usable remains or the configured skip limit is exceeded.
    pub fn from_source(
        source: &dyn GeometrySource,
        config: &StoreConfig,
    ) -> Result<Self, LoadError> {
        let started = Instant::now();
        let records = read_with_retry(source, config)?;
        let store = Self::assemble(records, config)?;

        log::info!(
            "Loaded {} regions ({} parts) from {} in {:?}; {} of {} features skipped",
            store.count(),
            store.part_count(),
            source.describe(),
            started.elapsed(),
            store.stats.features_skipped,
            store.stats.features_read,
        );

        Ok(store)
    }

    /// Builds a store from already-decoded features, typically synthetic test
    /// datasets. The same validation and skip policy applies.
    pub fn from_features(
        features: Vec<RegionFeature>,
        config: &StoreConfig,
    ) -> Result<Self, LoadError> {
        Self::from_source(&features, config)
    }

    fn assemble(records: Vec<FeatureRecord>, config: &StoreConfig) -> Result<Self, LoadError> {
        let mut stats = LoadStats::new();
        let mut regions: Vec<Region> = Vec::with_capacity(records.len());
        let mut by_id: FxHashMap<RegionId, SmallVec<[usize; 2]>> = FxHashMap::default();

        for (position, record) in records.into_iter().enumerate() {
            stats.record_read();

            let parts = match record.and_then(|feature| accept_feature(position, feature, config))
            {
                Ok(parts) => parts,
                Err(malformed) => {
                    stats.record_skipped();
                    log::warn!("Skipping malformed {}", malformed);

                    if let Some(limit) = config.max_skipped_features
                        && stats.features_skipped > limit
                    {
                        return Err(LoadError::TooManySkipped {
                            skipped: stats.features_skipped,
                            limit,
                        });
                    }
                    continue;
                }
            };

            let id = parts[0].id().clone();
            let slots = by_id.entry(id).or_default();
            if !slots.is_empty() {
                stats.record_duplicate();
                log::warn!(
                    "Feature #{} repeats identifier {}; merging it into the existing region",
                    position,
                    parts[0].id()
                );
            }

            stats.record_loaded(parts.len());
            for part in parts {
                slots.push(regions.len());
                regions.push(part);
            }
        }

        let Some(extent) = regions
            .iter()
            .map(|region| *region.bounding_box())
            .reduce(|acc, bbox| acc.union(&bbox))
        else {
            return Err(LoadError::NoUsableFeatures {
                read: stats.features_read,
                skipped: stats.features_skipped,
            });
        };

        let index = RegionIndex::build(
            regions
                .iter()
                .enumerate()
                .map(|(slot, region)| (slot, region.bounding_box())),
        );

        log::debug!(
            "Indexed {} region parts; extent [{}, {}] x [{}, {}]",
            index.len(),
            extent.min_x(),
            extent.max_x(),
            extent.min_y(),
            extent.max_y()
        );

        Ok(Self {
            regions,
            index,
            by_id,
            extent,
            stats,
        })
    }

    /// Number of logical regions (distinct identifiers).
    pub fn count(&self) -> usize {
        self.by_id.len()
    }

    /// Number of indexed polygon parts.
    pub fn part_count(&self) -> usize {
        self.regions.len()
    }

    /// Whether the store can answer queries.
    ///
    /// Construction is all-or-nothing, so an existing store is always ready;
    /// this exists for health reporting.
    pub fn is_ready(&self) -> bool {
        !self.regions.is_empty()
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn contains_id(&self, id: &RegionId) -> bool {
        self.by_id.contains_key(id)
    }

    /// All polygon parts carrying `id`, in load order.
    pub fn parts<'a>(&'a self, id: &RegionId) -> impl Iterator<Item = &'a Region> + use<'a> {
        self.by_id
            .get(id)
            .into_iter()
            .flatten()
            .map(move |&slot| &self.regions[slot])
    }

    pub fn load_stats(&self) -> &LoadStats {
        &self.stats
    }

    /// Union of every region's bounding box.
    pub fn extent(&self) -> &BoundingBox2D {
        &self.extent
    }

    /// Slots of regions whose bounding box contains `point`, ascending.
    pub(crate) fn candidates(&self, point: &Point<f64>) -> Candidates {
        self.index.candidates(point)
    }

    /// Resolves `point` to its containing region. See [`PointLocator::locate`].
    pub fn locate(&self, point: &Point<f64>) -> Location {
        PointLocator::locate(self, point)
    }
}

fn accept_feature(
    position: usize,
    feature: RegionFeature,
    config: &StoreConfig,
) -> Result<Vec<Region>, MalformedFeature> {
    let malformed = |reason: String| MalformedFeature { position, reason };

    if feature.polygons.is_empty() {
        return Err(malformed("feature has no polygons".to_string()));
    }

    let RegionFeature { id, polygons } = feature;
    polygons
        .into_iter()
        .enumerate()
        .map(|(part, polygon)| {
            validate_polygon_structure(&polygon)
                .and_then(|_| {
                    if config.validate_coordinates {
                        validate_polygon(&polygon)
                    } else {
                        Ok(())
                    }
                })
                .map_err(|e| malformed(format!("part {}: {}", part, e)))?;

            Region::new(id.clone(), polygon)
                .ok_or_else(|| malformed(format!("part {}: empty boundary", part)))
        })
        .collect()
}

fn read_with_retry(
    source: &dyn GeometrySource,
    config: &StoreConfig,
) -> Result<Vec<FeatureRecord>, LoadError> {
    let mut attempt = 0;
    loop {
        match source.read_features(config) {
            Err(err) if err.is_transient() && attempt < config.load_retries => {
                attempt += 1;
                log::warn!(
                    "Reading {} failed: {}; retry {}/{} in {:?}",
                    source.describe(),
                    err,
                    attempt,
                    config.load_retries,
                    config.retry_backoff()
                );
                std::thread::sleep(config.retry_backoff());
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Polygon, polygon};
    use std::cell::Cell;
    use std::path::PathBuf;
    use std::time::Duration;

    fn square(min_x: f64, min_y: f64, size: f64) -> Polygon<f64> {
        polygon![
            (x: min_x, y: min_y),
            (x: min_x, y: min_y + size),
            (x: min_x + size, y: min_y + size),
            (x: min_x + size, y: min_y),
            (x: min_x, y: min_y),
        ]
    }

    fn degenerate() -> Polygon<f64> {
        Polygon::new(LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]), vec![])
    }

    #[test]
    fn test_store_counts_logical_regions() {
        let store = RegionStore::from_features(
            vec![
                RegionFeature::polygon("A", square(0.0, 0.0, 1.0)),
                RegionFeature::new("B", vec![square(2.0, 0.0, 1.0), square(4.0, 0.0, 1.0)]),
            ],
            &StoreConfig::default(),
        )
        .unwrap();

        assert_eq!(store.count(), 2);
        assert_eq!(store.part_count(), 3);
        assert!(store.is_ready());
        assert_eq!(store.parts(&RegionId::from("B")).count(), 2);
        assert_eq!(store.parts(&RegionId::from("Z")).count(), 0);
        assert_eq!(*store.extent(), BoundingBox2D::new(0.0, 0.0, 5.0, 1.0));

        let stats = store.load_stats();
        assert_eq!(stats.features_read, 2);
        assert_eq!(stats.features_loaded, 2);
        assert_eq!(stats.parts_indexed, 3);
    }

    #[test]
    fn test_malformed_feature_skipped_and_counted() {
        let store = RegionStore::from_features(
            vec![
                RegionFeature::polygon("A", square(0.0, 0.0, 1.0)),
                RegionFeature::polygon("bad", degenerate()),
                RegionFeature::new("empty", vec![]),
                RegionFeature::polygon("far", square(500.0, 0.0, 1.0)),
            ],
            &StoreConfig::default(),
        )
        .unwrap();

        assert_eq!(store.count(), 1);
        assert_eq!(store.load_stats().features_skipped, 3);
        assert!(!store.contains_id(&RegionId::from("bad")));
    }

    #[test]
    fn test_coordinate_validation_can_be_disabled() {
        let config = StoreConfig::default().with_coordinate_validation(false);
        let store = RegionStore::from_features(
            vec![RegionFeature::polygon("projected", square(500_000.0, 7_000_000.0, 10.0))],
            &config,
        )
        .unwrap();

        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_one_bad_part_skips_whole_feature() {
        let store = RegionStore::from_features(
            vec![
                RegionFeature::polygon("A", square(0.0, 0.0, 1.0)),
                RegionFeature::new("B", vec![square(2.0, 0.0, 1.0), degenerate()]),
            ],
            &StoreConfig::default(),
        )
        .unwrap();

        assert_eq!(store.count(), 1);
        assert_eq!(store.part_count(), 1);
    }

    #[test]
    fn test_no_usable_features() {
        let err = RegionStore::from_features(
            vec![RegionFeature::polygon("bad", degenerate())],
            &StoreConfig::default(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            LoadError::NoUsableFeatures {
                read: 1,
                skipped: 1
            }
        ));

        let err = RegionStore::from_features(vec![], &StoreConfig::default()).unwrap_err();
        assert!(matches!(err, LoadError::NoUsableFeatures { read: 0, .. }));
    }

    #[test]
    fn test_skip_limit() {
        let features = vec![
            RegionFeature::polygon("A", square(0.0, 0.0, 1.0)),
            RegionFeature::polygon("bad1", degenerate()),
            RegionFeature::polygon("bad2", degenerate()),
        ];

        let lenient = StoreConfig::default().with_max_skipped_features(2);
        assert!(RegionStore::from_features(features.clone(), &lenient).is_ok());

        let strict = StoreConfig::default().with_max_skipped_features(1);
        let err = RegionStore::from_features(features, &strict).unwrap_err();
        assert!(matches!(
            err,
            LoadError::TooManySkipped {
                skipped: 2,
                limit: 1
            }
        ));
    }

    #[test]
    fn test_duplicate_ids_merge() {
        let store = RegionStore::from_features(
            vec![
                RegionFeature::polygon("A", square(0.0, 0.0, 1.0)),
                RegionFeature::polygon("A", square(3.0, 0.0, 1.0)),
            ],
            &StoreConfig::default(),
        )
        .unwrap();

        assert_eq!(store.count(), 1);
        assert_eq!(store.part_count(), 2);
        assert_eq!(store.load_stats().duplicate_ids, 1);
    }

    #[test]
    fn test_store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RegionStore>();
    }

    struct FlakySource {
        failures: Cell<u32>,
        kind: std::io::ErrorKind,
        features: Vec<RegionFeature>,
    }

    impl GeometrySource for FlakySource {
        fn describe(&self) -> String {
            "flaky source".to_string()
        }

        fn read_features(&self, config: &StoreConfig) -> Result<Vec<FeatureRecord>, LoadError> {
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Err(LoadError::Io {
                    path: PathBuf::from("flaky.geojson"),
                    source: std::io::Error::new(self.kind, "temporarily unavailable"),
                });
            }
            self.features.read_features(config)
        }
    }

    #[test]
    fn test_transient_failures_retried() {
        let source = FlakySource {
            failures: Cell::new(2),
            kind: std::io::ErrorKind::Interrupted,
            features: vec![RegionFeature::polygon("A", square(0.0, 0.0, 1.0))],
        };

        let no_retry = StoreConfig::default();
        assert!(RegionStore::from_source(&source, &no_retry).is_err());

        // One failure left; a single retry absorbs it.
        let retry = StoreConfig::default().with_load_retries(1, Duration::from_millis(1));
        let store = RegionStore::from_source(&source, &retry).unwrap();
        assert_eq!(store.count(), 1);
        assert_eq!(source.failures.get(), 0);
    }

    #[test]
    fn test_permanent_failures_not_retried() {
        let source = FlakySource {
            failures: Cell::new(2),
            kind: std::io::ErrorKind::PermissionDenied,
            features: vec![RegionFeature::polygon("A", square(0.0, 0.0, 1.0))],
        };

        let retry = StoreConfig::default().with_load_retries(5, Duration::from_millis(1));
        assert!(RegionStore::from_source(&source, &retry).is_err());
        assert_eq!(source.failures.get(), 1);
    }

    #[test]
    fn test_build_missing_file() {
        let err = RegionStore::build("/no/such/tracts.geojson").unwrap_err();
        assert!(matches!(err, LoadError::SourceNotFound { .. }));
    }

    struct RecordingLogger {
        lines: std::sync::Mutex<Vec<String>>,
    }

    impl log::Log for RecordingLogger {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.level() <= log::Level::Info
        }

        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.lines.lock().unwrap().push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    static RECORDER: RecordingLogger = RecordingLogger {
        lines: std::sync::Mutex::new(Vec::new()),
    };

    #[test]
    fn test_from_features_logs_load_summary() {
        static INIT: std::sync::Once = std::sync::Once::new();
        INIT.call_once(|| {
            log::set_logger(&RECORDER).unwrap();
            log::set_max_level(log::LevelFilter::Info);
        });

        RegionStore::from_features(
            vec![
                RegionFeature::polygon("summary-a", square(0.0, 0.0, 1.0)),
                RegionFeature::polygon("summary-b", square(1.0, 0.0, 1.0)),
                RegionFeature::polygon("summary-c", square(2.0, 0.0, 1.0)),
                RegionFeature::polygon("summary-d", square(3.0, 0.0, 1.0)),
                RegionFeature::polygon("summary-e", square(4.0, 0.0, 1.0)),
                RegionFeature::polygon("summary-f", square(5.0, 0.0, 1.0)),
                RegionFeature::polygon("summary-g", square(6.0, 0.0, 1.0)),
            ],
            &StoreConfig::default(),
        )
        .unwrap();

        let lines = RECORDER.lines.lock().unwrap();
        assert!(
            lines
                .iter()
                .any(|line| line.starts_with("Loaded 7 regions (7 parts) from 7 in-memory features")),
            "{lines:?}"
        );
    }
}
