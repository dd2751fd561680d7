use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque region identifier taken from the dataset's per-feature code field.
///
/// Numeric codes are carried in their textual form so that leading zeros and
/// 15-digit census codes survive unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(String);

impl RegionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RegionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RegionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for RegionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for RegionId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for RegionId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_id_serializes_as_plain_string() {
        let id = RegionId::from("355030801000001");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"355030801000001\"");

        let back: RegionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_region_id_compares_with_str() {
        let id = RegionId::new("A");
        assert_eq!(id, "A");
        assert_eq!(id.to_string(), "A");
    }
}
