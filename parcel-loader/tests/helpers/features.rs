//! Feature builders for parcel and address fixtures

use parcel_loader::RawFeature;
use serde_json::{json, Map, Value};

/// Self-intersecting ring; invalid, repairable into two triangles
pub const BOWTIE: [[f64; 2]; 5] = [[0.0, 0.0], [2.0, 2.0], [2.0, 0.0], [0.0, 2.0], [0.0, 0.0]];

/// Axis-aligned square polygon with its lower-left corner at (x, y)
pub fn square(x: f64, y: f64, size: f64) -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[[x, y], [x + size, y], [x + size, y + size], [x, y + size], [x, y]]]
    })
}

pub fn parcel_feature(apn: &str, geometry: Value) -> RawFeature {
    let mut properties = Map::new();
    properties.insert("PRCL_ID".to_string(), json!(apn));
    RawFeature::new(properties, Some(geometry))
}

/// Address feature with a point geometry
pub fn address_feature(apn: &str, number: &str, street: &str, point: [f64; 2]) -> RawFeature {
    let mut properties = Map::new();
    properties.insert("PRCL_ID".to_string(), json!(apn));
    properties.insert("ADDR_NBR".to_string(), json!(number));
    properties.insert("NAME_ROOT".to_string(), json!(street));
    RawFeature::new(
        properties,
        Some(json!({ "type": "Point", "coordinates": point })),
    )
}
