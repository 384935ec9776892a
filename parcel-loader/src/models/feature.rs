//! Raw feature records and the FeatureCollection interchange document
//!
//! Features are kept close to their GeoJSON shape: free-form `properties`
//! and an optional `geometry` object. They are never persisted as-is; the
//! store converts geometry with the spatial engine at insert time.

use parcel_common::Result;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Free-form feature attributes
pub type Properties = Map<String, Value>;

const FEATURE_TYPE: &str = "Feature";
const COLLECTION_TYPE: &str = "FeatureCollection";

/// One geospatial record: attribute properties plus a geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFeature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,

    /// Source-assigned feature id, carried through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Properties,

    #[serde(default)]
    pub geometry: Option<Value>,
}

impl RawFeature {
    pub fn new(properties: Properties, geometry: Option<Value>) -> Self {
        Self {
            kind: feature_type(),
            id: None,
            properties,
            geometry,
        }
    }

    /// Geometry as GeoJSON text, or `None` when absent or JSON null
    pub fn geometry_json(&self) -> Option<String> {
        self.geometry
            .as_ref()
            .filter(|g| !g.is_null())
            .map(Value::to_string)
    }
}

/// Standard GeoJSON FeatureCollection document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "collection_type")]
    pub kind: String,

    #[serde(default)]
    pub features: Vec<RawFeature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<RawFeature>) -> Self {
        Self {
            kind: collection_type(),
            features,
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read a FeatureCollection document from disk
    pub fn read_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Write the document as indented JSON, creating parent directories
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::info!(
            "Saved {} features to {}",
            self.features.len(),
            path.display()
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

fn feature_type() -> String {
    FEATURE_TYPE.to_string()
}

fn collection_type() -> String {
    COLLECTION_TYPE.to_string()
}

// ArcGIS emits `"properties": null` for attribute-less features
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Properties, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Properties>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_parse_feature_with_null_properties() {
        let collection = FeatureCollection::from_json_str(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","id":7,"properties":null,"geometry":null}
            ]}"#,
        )
        .unwrap();

        let feature = &collection.features[0];
        assert!(feature.properties.is_empty());
        assert_eq!(feature.id, Some(json!(7)));
        assert_eq!(feature.geometry_json(), None);
    }

    #[test]
    fn test_geometry_json_is_compact() {
        let feature = RawFeature::new(
            Properties::new(),
            Some(json!({"type": "Point", "coordinates": [-120.5, 38.7]})),
        );
        assert_eq!(
            feature.geometry_json().unwrap(),
            r#"{"coordinates":[-120.5,38.7],"type":"Point"}"#
        );
    }

    #[test]
    fn test_write_then_read_preserves_nesting() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("out.geojson");

        let mut properties = Properties::new();
        properties.insert("PRCL_ID".to_string(), json!("001234"));
        let collection = FeatureCollection::new(vec![RawFeature::new(
            properties,
            Some(json!({"type": "Point", "coordinates": [1.0, 2.0]})),
        )]);

        collection.write_to(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("{\n  \"type\": \"FeatureCollection\""));

        let restored = FeatureCollection::read_from(&path).unwrap();
        assert_eq!(restored, collection);
    }
}
