use serde::{Deserialize, Serialize};

/// Counters collected while building a region store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    /// Features found in the source dataset
    pub features_read: usize,
    /// Features accepted into the store
    pub features_loaded: usize,
    /// Malformed features skipped during load
    pub features_skipped: usize,
    /// Polygon parts inserted into the spatial index
    pub parts_indexed: usize,
    /// Features whose identifier was already present and got merged
    pub duplicate_ids: usize,
}

impl LoadStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_read(&mut self) {
        self.features_read += 1;
    }

    pub fn record_loaded(&mut self, parts: usize) {
        self.features_loaded += 1;
        self.parts_indexed += parts;
    }

    pub fn record_skipped(&mut self) {
        self.features_skipped += 1;
    }

    pub fn record_duplicate(&mut self) {
        self.duplicate_ids += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_stats_counters() {
        let mut stats = LoadStats::new();
        stats.record_read();
        stats.record_read();
        stats.record_loaded(3);
        stats.record_skipped();

        assert_eq!(stats.features_read, 2);
        assert_eq!(stats.features_loaded, 1);
        assert_eq!(stats.parts_indexed, 3);
        assert_eq!(stats.features_skipped, 1);
        assert_eq!(stats.duplicate_ids, 0);
    }
}
