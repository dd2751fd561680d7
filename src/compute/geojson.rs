//! GeoJSON dataset reader.
//!
//! Turns a `FeatureCollection` (or a single `Feature`) into per-feature
//! records. Per-feature problems become [`MalformedFeature`] records so the
//! store can skip and count them; only problems with the document as a whole
//! are returned as [`LoadError`].

use crate::config::StoreConfig;
use crate::error::LoadError;
use crate::region::RegionFeature;
use crate::store::{FeatureRecord, GeometrySource, MalformedFeature};
use geojson::feature::Id;
use geojson::{Feature, GeoJson, Value};
use geotract_types::region::RegionId;
use std::path::{Path, PathBuf};

/// A GeoJSON dataset on disk.
#[derive(Debug, Clone)]
pub struct GeoJsonFile {
    path: PathBuf,
}

impl GeoJsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<serde_json::Value, LoadError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                LoadError::SourceNotFound {
                    path: self.path.clone(),
                }
            } else {
                LoadError::Io {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;

        serde_json::from_str(&text)
            .map_err(|e| LoadError::Parse(format!("{}: {}", self.path.display(), e)))
    }
}

impl GeometrySource for GeoJsonFile {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn read_features(&self, config: &StoreConfig) -> Result<Vec<FeatureRecord>, LoadError> {
        features_from_json(self.read()?, config)
            .map_err(|e| match e {
                LoadError::Parse(msg) => {
                    LoadError::Parse(format!("{}: {}", self.path.display(), msg))
                }
                other => other,
            })
    }
}

impl GeometrySource for GeoJson {
    fn describe(&self) -> String {
        "in-memory GeoJSON".to_string()
    }

    fn read_features(&self, config: &StoreConfig) -> Result<Vec<FeatureRecord>, LoadError> {
        features_from_geojson(self, config)
    }
}

/// Extracts one record per feature of an already-typed GeoJSON document.
pub fn features_from_geojson(
    geojson: &GeoJson,
    config: &StoreConfig,
) -> Result<Vec<FeatureRecord>, LoadError> {
    match geojson {
        GeoJson::FeatureCollection(collection) => Ok(collection
            .features
            .iter()
            .enumerate()
            .map(|(position, feature)| read_feature(position, feature, config))
            .collect()),
        GeoJson::Feature(feature) => Ok(vec![read_feature(0, feature, config)]),
        GeoJson::Geometry(_) => Err(bare_geometry()),
    }
}

/// Extracts one record per feature of a raw JSON document.
///
/// Only the document shape (a `FeatureCollection` with a `features` array, or
/// a single `Feature`) is checked up front. Each feature is then decoded on
/// its own, so one that breaks the GeoJSON schema becomes a
/// [`MalformedFeature`] record instead of failing the whole document.
pub fn features_from_json(
    document: serde_json::Value,
    config: &StoreConfig,
) -> Result<Vec<FeatureRecord>, LoadError> {
    let serde_json::Value::Object(mut object) = document else {
        return Err(LoadError::Parse(
            "GeoJSON document must be a JSON object".to_string(),
        ));
    };

    let kind = object
        .get("type")
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| LoadError::Parse("GeoJSON document has no \"type\"".to_string()))?;

    match kind.as_str() {
        "FeatureCollection" => {
            let Some(serde_json::Value::Array(features)) = object.remove("features") else {
                return Err(LoadError::Parse(
                    "FeatureCollection must have a \"features\" array".to_string(),
                ));
            };

            Ok(features
                .into_iter()
                .enumerate()
                .map(|(position, value)| decode_feature(position, value, config))
                .collect())
        }
        "Feature" => Ok(vec![decode_feature(
            0,
            serde_json::Value::Object(object),
            config,
        )]),
        "Point" | "MultiPoint" | "LineString" | "MultiLineString" | "Polygon"
        | "MultiPolygon" | "GeometryCollection" => Err(bare_geometry()),
        other => Err(LoadError::Parse(format!(
            "unknown GeoJSON document type {other:?}"
        ))),
    }
}

fn decode_feature(position: usize, value: serde_json::Value, config: &StoreConfig) -> FeatureRecord {
    let serde_json::Value::Object(object) = value else {
        return Err(MalformedFeature {
            position,
            reason: "feature is not a JSON object".to_string(),
        });
    };

    let feature = Feature::from_json_object(object).map_err(|e| MalformedFeature {
        position,
        reason: format!("invalid GeoJSON feature: {e}"),
    })?;

    read_feature(position, &feature, config)
}

fn bare_geometry() -> LoadError {
    LoadError::Parse(
        "expected a FeatureCollection or Feature, found a bare geometry without identifiers"
            .to_string(),
    )
}

fn read_feature(position: usize, feature: &Feature, config: &StoreConfig) -> FeatureRecord {
    let malformed = |reason: String| MalformedFeature { position, reason };

    let id = feature_id(feature, config).ok_or_else(|| {
        malformed(format!(
            "missing identifier field {:?}",
            config.id_field
        ))
    })?;

    let geometry = feature
        .geometry
        .as_ref()
        .ok_or_else(|| malformed("feature has no geometry".to_string()))?;

    let polygons = match &geometry.value {
        Value::Polygon(rings) => vec![polygon_from_rings(rings).map_err(malformed)?],
        Value::MultiPolygon(parts) => parts
            .iter()
            .map(|rings| polygon_from_rings(rings))
            .collect::<Result<Vec<_>, _>>()
            .map_err(malformed)?,
        other => {
            return Err(malformed(format!(
                "unsupported geometry type {}",
                geometry_type_name(other)
            )));
        }
    };

    if polygons.is_empty() {
        return Err(malformed("multi-polygon has no parts".to_string()));
    }

    Ok(RegionFeature::new(id, polygons))
}

fn feature_id(feature: &Feature, config: &StoreConfig) -> Option<RegionId> {
    let property = feature
        .properties
        .as_ref()
        .and_then(|props| props.get(&config.id_field))
        .and_then(id_from_json);

    if property.is_some() || !config.fallback_to_feature_id {
        return property;
    }

    match feature.id.as_ref()? {
        Id::String(s) => non_empty(s),
        Id::Number(n) => Some(RegionId::new(n.to_string())),
    }
}

fn id_from_json(value: &serde_json::Value) -> Option<RegionId> {
    match value {
        serde_json::Value::String(s) => non_empty(s),
        serde_json::Value::Number(n) => Some(RegionId::new(n.to_string())),
        _ => None,
    }
}

fn non_empty(s: &str) -> Option<RegionId> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| RegionId::from(trimmed))
}

fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> Result<geo::Polygon<f64>, String> {
    let Some((exterior, interiors)) = rings.split_first() else {
        return Err("polygon must have at least one ring".to_string());
    };

    let exterior = ring_from_positions(exterior)?;
    let interiors = interiors
        .iter()
        .map(|ring| ring_from_positions(ring))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(geo::Polygon::new(exterior, interiors))
}

fn ring_from_positions(ring: &[Vec<f64>]) -> Result<geo::LineString<f64>, String> {
    ring.iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok(geo::Coord { x: *x, y: *y }),
            _ => Err("coordinate must have at least 2 values".to_string()),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(geo::LineString::from)
}

fn geometry_type_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GeoJson {
        json.parse::<GeoJson>().unwrap()
    }

    #[test]
    fn test_reads_polygon_feature_with_string_id() {
        let doc = parse(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"CD_SETOR":"355030801000001"},
                 "geometry":{"type":"Polygon","coordinates":[[[0,0],[0,10],[10,10],[10,0],[0,0]]]}}
            ]}"#,
        );

        let records = features_from_geojson(&doc, &StoreConfig::default()).unwrap();
        assert_eq!(records.len(), 1);

        let feature = records[0].as_ref().unwrap();
        assert_eq!(feature.id, "355030801000001");
        assert_eq!(feature.polygons.len(), 1);
        assert_eq!(feature.polygons[0].exterior().coords().count(), 5);
    }

    #[test]
    fn test_numeric_id_and_multipolygon() {
        let doc = parse(
            r#"{"type":"Feature","properties":{"CD_SETOR":42},
                "geometry":{"type":"MultiPolygon","coordinates":[
                    [[[0,0],[0,1],[1,1],[1,0],[0,0]]],
                    [[[5,5],[5,6],[6,6],[6,5],[5,5]]]
                ]}}"#,
        );

        let records = features_from_geojson(&doc, &StoreConfig::default()).unwrap();
        let feature = records[0].as_ref().unwrap();
        assert_eq!(feature.id, "42");
        assert_eq!(feature.polygons.len(), 2);
    }

    #[test]
    fn test_custom_id_field_and_feature_id_fallback() {
        let doc = parse(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"GEOID":"a"},
                 "geometry":{"type":"Polygon","coordinates":[[[0,0],[0,1],[1,1],[0,0]]]}},
                {"type":"Feature","id":"b","properties":{},
                 "geometry":{"type":"Polygon","coordinates":[[[0,0],[0,1],[1,1],[0,0]]]}}
            ]}"#,
        );

        let config = StoreConfig::default().with_id_field("GEOID");
        let records = features_from_geojson(&doc, &config).unwrap();
        assert_eq!(records[0].as_ref().unwrap().id, "a");
        assert_eq!(records[1].as_ref().unwrap().id, "b");

        let strict = config.with_fallback_to_feature_id(false);
        let records = features_from_geojson(&doc, &strict).unwrap();
        assert!(records[0].is_ok());
        let err = records[1].as_ref().unwrap_err();
        assert_eq!(err.position, 1);
        assert!(err.reason.contains("GEOID"));
    }

    #[test]
    fn test_malformed_features_are_records_not_errors() {
        let doc = parse(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"CD_SETOR":"1"},"geometry":null},
                {"type":"Feature","properties":{"CD_SETOR":"2"},
                 "geometry":{"type":"Point","coordinates":[1,2]}},
                {"type":"Feature","properties":{"CD_SETOR":""},
                 "geometry":{"type":"Polygon","coordinates":[[[0,0],[0,1],[1,1],[0,0]]]}},
                {"type":"Feature","properties":{"CD_SETOR":"4"},
                 "geometry":{"type":"Polygon","coordinates":[]}}
            ]}"#,
        );

        let records = features_from_geojson(&doc, &StoreConfig::default()).unwrap();
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.is_err()));

        let reasons: Vec<_> = records
            .iter()
            .map(|r| r.as_ref().unwrap_err().reason.clone())
            .collect();
        assert!(reasons[0].contains("no geometry"));
        assert!(reasons[1].contains("Point"));
        assert!(reasons[2].contains("missing identifier"));
        assert!(reasons[3].contains("at least one ring"));
    }

    #[test]
    fn test_schema_breaking_features_do_not_sink_the_document() {
        let doc = serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"CD_SETOR": "good"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[0,1],[1,1],[1,0],[0,0]]]}},
                {"type": "Feature", "properties": {"CD_SETOR": "text-coords"},
                 "geometry": {"type": "Polygon", "coordinates": [[["x",1],[0,1],[1,1],[0,0]]]}},
                {"type": "Feature", "properties": {"CD_SETOR": "no-geometry-key"}},
                {"type": "Feature", "properties": {"CD_SETOR": "circle"},
                 "geometry": {"type": "Circle", "coordinates": [0, 0]}},
                "not a feature"
            ]
        });

        let records = features_from_json(doc, &StoreConfig::default()).unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].as_ref().unwrap().id, "good");

        for (position, record) in records.iter().enumerate().skip(1) {
            let err = record.as_ref().unwrap_err();
            assert_eq!(err.position, position);
        }
        assert!(records[1].as_ref().unwrap_err().reason.contains("invalid GeoJSON feature"));
        assert!(records[4].as_ref().unwrap_err().reason.contains("not a JSON object"));
    }

    #[test]
    fn test_document_shape_errors_are_fatal() {
        let config = StoreConfig::default();
        for doc in [
            serde_json::json!([1, 2, 3]),
            serde_json::json!({"features": []}),
            serde_json::json!({"type": "FeatureCollection"}),
            serde_json::json!({"type": "FeatureCollection", "features": {}}),
            serde_json::json!({"type": "Topology"}),
            serde_json::json!({"type": "Polygon", "coordinates": [[[0,0],[0,1],[1,1],[0,0]]]}),
        ] {
            assert!(
                matches!(features_from_json(doc.clone(), &config), Err(LoadError::Parse(_))),
                "{doc}"
            );
        }
    }

    #[test]
    fn test_single_feature_document() {
        let doc = serde_json::json!({
            "type": "Feature", "properties": {"CD_SETOR": "solo"},
            "geometry": {"type": "Polygon", "coordinates": [[[0,0],[0,1],[1,1],[0,0]]]}
        });

        let records = features_from_json(doc, &StoreConfig::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].as_ref().unwrap().id, "solo");
    }

    #[test]
    fn test_bare_geometry_rejected() {
        let doc = parse(r#"{"type":"Polygon","coordinates":[[[0,0],[0,1],[1,1],[0,0]]]}"#);
        assert!(matches!(
            features_from_geojson(&doc, &StoreConfig::default()),
            Err(LoadError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let source = GeoJsonFile::new("/definitely/not/here.geojson");
        let err = source.read_features(&StoreConfig::default()).unwrap_err();
        assert!(matches!(err, LoadError::SourceNotFound { .. }));
    }

    #[test]
    fn test_unparseable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.geojson");
        std::fs::write(&path, "{ not geojson").unwrap();

        let err = GeoJsonFile::new(&path)
            .read_features(&StoreConfig::default())
            .unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
    }
}
