//! Region store builder
//!
//! Fluent configuration for loading a [`RegionStore`] from a dataset path or
//! any [`GeometrySource`].

use crate::compute::geojson::GeoJsonFile;
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::store::{GeometrySource, RegionStore};
use std::path::PathBuf;
use std::time::Duration;

/// Builder for region stores with custom dataset paths and load settings.
#[derive(Debug, Default)]
pub struct RegionStoreBuilder {
    path: Option<PathBuf>,
    config: StoreConfig,
}

impl RegionStoreBuilder {
    /// Create a new builder with the default configuration and no dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the GeoJSON dataset to load.
    pub fn path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Replace the whole load configuration.
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Feature property carrying the region identifier.
    pub fn id_field(mut self, field: impl Into<String>) -> Self {
        self.config = self.config.with_id_field(field);
        self
    }

    pub fn max_skipped_features(mut self, limit: usize) -> Self {
        self.config = self.config.with_max_skipped_features(limit);
        self
    }

    pub fn load_retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.config = self.config.with_load_retries(retries, backoff);
        self
    }

    /// Build the store from the configured path.
    pub fn build(self) -> Result<RegionStore> {
        let Some(path) = self.path.as_ref() else {
            return Err(Error::InvalidConfig(
                "no dataset path configured".to_string(),
            ));
        };
        self.build_from(&GeoJsonFile::new(path))
    }

    /// Build the store from an arbitrary source, ignoring any configured path.
    pub fn build_from(&self, source: &dyn GeometrySource) -> Result<RegionStore> {
        self.config.validate().map_err(Error::InvalidConfig)?;
        Ok(RegionStore::from_source(source, &self.config)?)
    }
}
