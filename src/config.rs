//! Configuration for building region stores.
use serde::de::Error;
use std::time::Duration;

/// Region store load configuration
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Feature property carrying the region code
    #[serde(default = "StoreConfig::default_id_field")]
    pub id_field: String,

    /// Use the GeoJSON feature-level `id` when `id_field` is absent
    #[serde(default = "StoreConfig::default_fallback_to_feature_id")]
    pub fallback_to_feature_id: bool,

    /// Abort the load once more than this many features have been skipped
    #[serde(default)]
    pub max_skipped_features: Option<usize>,

    /// Reject vertices outside lon [-180, 180] / lat [-90, 90]
    #[serde(default = "StoreConfig::default_validate_coordinates")]
    pub validate_coordinates: bool,

    /// Extra attempts after a transient I/O failure while reading the source
    #[serde(default)]
    pub load_retries: u32,

    #[serde(default = "StoreConfig::default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl StoreConfig {
    fn default_id_field() -> String {
        "CD_SETOR".to_string()
    }

    const fn default_fallback_to_feature_id() -> bool {
        true
    }

    const fn default_validate_coordinates() -> bool {
        true
    }

    const fn default_retry_backoff_ms() -> u64 {
        250
    }

    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    pub fn with_fallback_to_feature_id(mut self, enabled: bool) -> Self {
        self.fallback_to_feature_id = enabled;
        self
    }

    /// Bound the number of malformed features tolerated. `0` makes any
    /// malformed feature fatal.
    pub fn with_max_skipped_features(mut self, limit: usize) -> Self {
        self.max_skipped_features = Some(limit);
        self
    }

    pub fn with_coordinate_validation(mut self, enabled: bool) -> Self {
        self.validate_coordinates = enabled;
        self
    }

    pub fn with_load_retries(mut self, retries: u32, backoff: Duration) -> Self {
        if retries > 10 {
            log::warn!(
                "{} load retries requested; startup may stall for a long time on a bad source",
                retries
            );
        }

        self.load_retries = retries;
        self.retry_backoff_ms = backoff.as_millis().min(u64::MAX as u128) as u64;
        self
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.id_field.trim().is_empty() {
            return Err("Identifier field name cannot be empty".to_string());
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: StoreConfig = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: StoreConfig = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            id_field: Self::default_id_field(),
            fallback_to_feature_id: Self::default_fallback_to_feature_id(),
            max_skipped_features: None,
            validate_coordinates: Self::default_validate_coordinates(),
            load_retries: 0,
            retry_backoff_ms: Self::default_retry_backoff_ms(),
        }
    }
}
