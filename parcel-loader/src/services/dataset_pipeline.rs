//! Dataset cleaning over whole feature collections
//!
//! Both entry points are pure: they take ownership of an in-memory feature
//! list and return the cleaned list plus drop counts. Survivors keep their
//! input order, so a fixed input always produces identical output.

use crate::models::RawFeature;
use crate::services::deduplicator::{dedupe, identity_key};
use crate::services::normalizer::{
    clean_identifier, is_address_complete, standardize_text_component, stringify,
    ADDRESS_KEY_FIELDS, IDENTIFIER_FIELD, REQUIRED_ADDRESS_FIELDS, STANDARDIZED_FIELDS,
};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

/// Cleaned features plus what was dropped and why
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanReport {
    #[serde(skip)]
    pub features: Vec<RawFeature>,
    pub input_count: usize,
    pub dropped_missing_identifier: usize,
    pub dropped_incomplete: usize,
    pub dropped_duplicate: usize,
}

impl CleanReport {
    pub fn kept(&self) -> usize {
        self.features.len()
    }
}

/// Clean address features
///
/// 1. Drop features without a non-empty parcel identifier
/// 2. Drop features failing the completeness gate
/// 3. Normalize the identifier and the address components in place
/// 4. Drop later features whose identity key repeats an earlier one
pub fn clean_address_dataset(features: Vec<RawFeature>) -> CleanReport {
    let input_count = features.len();
    let mut dropped_missing_identifier = 0;
    let mut dropped_incomplete = 0;
    let mut normalized = Vec::with_capacity(input_count);

    for mut feature in features {
        let has_identifier = feature
            .properties
            .get(IDENTIFIER_FIELD)
            .map(|value| !stringify(value).trim().is_empty())
            .unwrap_or(false);
        if !has_identifier {
            dropped_missing_identifier += 1;
            continue;
        }

        if !is_address_complete(&feature.properties, &REQUIRED_ADDRESS_FIELDS) {
            dropped_incomplete += 1;
            continue;
        }

        normalize_identifier(&mut feature);
        for field in STANDARDIZED_FIELDS {
            if let Some(value) = feature.properties.get_mut(field) {
                *value = Value::String(standardize_text_component(value));
            }
        }

        normalized.push(feature);
    }

    let (features, dropped_duplicate) = dedupe(normalized, |feature| {
        identity_key(&feature.properties, feature.geometry.as_ref(), &ADDRESS_KEY_FIELDS)
    });

    let report = CleanReport {
        features,
        input_count,
        dropped_missing_identifier,
        dropped_incomplete,
        dropped_duplicate,
    };
    info!(
        input = report.input_count,
        kept = report.kept(),
        missing_identifier = report.dropped_missing_identifier,
        incomplete = report.dropped_incomplete,
        duplicate = report.dropped_duplicate,
        "Cleaned address dataset"
    );
    report
}

/// Clean parcel features
///
/// Only the identifier is normalized. Nothing is dropped: duplicate or
/// unusual identifiers are resolved later by the store's conflict-skip insert.
pub fn clean_apn_dataset(features: Vec<RawFeature>) -> CleanReport {
    let input_count = features.len();
    let features: Vec<RawFeature> = features
        .into_iter()
        .map(|mut feature| {
            normalize_identifier(&mut feature);
            feature
        })
        .collect();

    info!(input = input_count, "Standardized parcel identifiers");
    CleanReport {
        features,
        input_count,
        ..Default::default()
    }
}

fn normalize_identifier(feature: &mut RawFeature) {
    if let Some(value) = feature.properties.get_mut(IDENTIFIER_FIELD) {
        *value = Value::String(clean_identifier(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Properties;
    use serde_json::json;

    fn feature(properties: Value, geometry: Value) -> RawFeature {
        let properties: Properties = properties.as_object().cloned().unwrap();
        RawFeature::new(properties, Some(geometry))
    }

    fn point(x: f64, y: f64) -> Value {
        json!({"type": "Point", "coordinates": [x, y]})
    }

    #[test]
    fn test_address_cleaning_normalizes_fields() {
        let input = vec![feature(
            json!({"PRCL_ID": "001-234-05", "ADDR_NBR": " 123 ", "NAME_ROOT": "main  street", "SUFFIX": "rd", "CITY": "placerville"}),
            point(-120.8, 38.7),
        )];

        let report = clean_address_dataset(input);
        let props = &report.features[0].properties;

        assert_eq!(props["PRCL_ID"], json!("00123405"));
        assert_eq!(props["ADDR_NBR"], json!("123"));
        assert_eq!(props["NAME_ROOT"], json!("Main Street"));
        assert_eq!(props["SUFFIX"], json!("Rd"));
        // Not an address component: left untouched
        assert_eq!(props["CITY"], json!("placerville"));
    }

    #[test]
    fn test_missing_name_root_is_excluded() {
        let input = vec![
            feature(
                json!({"PRCL_ID": "1", "ADDR_NBR": "10", "PREFIX": "N", "SUFFIX": "St", "ADDR_UNIT_NBR": "4"}),
                point(0.0, 0.0),
            ),
            feature(json!({"PRCL_ID": "2", "ADDR_NBR": "11", "NAME_ROOT": "Pine"}), point(1.0, 1.0)),
        ];

        let report = clean_address_dataset(input);
        assert_eq!(report.kept(), 1);
        assert_eq!(report.dropped_incomplete, 1);
        assert_eq!(report.features[0].properties["PRCL_ID"], json!("2"));
    }

    #[test]
    fn test_missing_or_blank_identifier_is_excluded() {
        let input = vec![
            feature(json!({"ADDR_NBR": "10", "NAME_ROOT": "Oak"}), point(0.0, 0.0)),
            feature(json!({"PRCL_ID": "  ", "ADDR_NBR": "10", "NAME_ROOT": "Oak"}), point(0.0, 0.0)),
        ];

        let report = clean_address_dataset(input);
        assert_eq!(report.kept(), 0);
        assert_eq!(report.dropped_missing_identifier, 2);
    }

    #[test]
    fn test_duplicates_keep_first_in_input_order() {
        let input = vec![
            feature(json!({"PRCL_ID": "A1", "ADDR_NBR": "123", "NAME_ROOT": "main", "SUFFIX": "st"}), json!({"type": "MultiPoint", "coordinates": [[-120.5, 38.7]]})),
            feature(json!({"PRCL_ID": "B2", "ADDR_NBR": "123", "NAME_ROOT": "MAIN", "SUFFIX": "ST"}), json!({"type": "MultiPoint", "coordinates": [[-120.5, 38.7]]})),
            feature(json!({"PRCL_ID": "C3", "ADDR_NBR": "124", "NAME_ROOT": "main", "SUFFIX": "st"}), json!({"type": "MultiPoint", "coordinates": [[-120.5, 38.7]]})),
        ];

        let report = clean_address_dataset(input);
        let ids: Vec<_> = report
            .features
            .iter()
            .map(|f| f.properties["PRCL_ID"].clone())
            .collect();

        assert_eq!(ids, vec![json!("A1"), json!("C3")]);
        assert_eq!(report.dropped_duplicate, 1);
    }

    #[test]
    fn test_apn_cleaning_keeps_every_feature() {
        let input = vec![
            feature(json!({"PRCL_ID": "001-01"}), point(0.0, 0.0)),
            feature(json!({"PRCL_ID": "001 01"}), point(1.0, 1.0)),
            feature(json!({"OTHER": "x"}), point(2.0, 2.0)),
        ];

        let report = clean_apn_dataset(input);
        assert_eq!(report.kept(), 3);
        assert_eq!(report.features[0].properties["PRCL_ID"], json!("00101"));
        assert_eq!(report.features[1].properties["PRCL_ID"], json!("00101"));
        assert!(!report.features[2].properties.contains_key("PRCL_ID"));
    }

    #[test]
    fn test_cleaning_is_deterministic() {
        let input = vec![
            feature(json!({"PRCL_ID": "9-9", "ADDR_NBR": "5", "NAME_ROOT": "elm  way"}), point(2.0, 3.0)),
            feature(json!({"PRCL_ID": "9-9", "ADDR_NBR": "5", "NAME_ROOT": "ELM WAY"}), point(2.0, 3.0)),
            feature(json!({"PRCL_ID": "7", "ADDR_NBR": "6", "NAME_ROOT": "ash"}), point(4.0, 5.0)),
        ];

        let first = clean_address_dataset(input.clone());
        let second = clean_address_dataset(input.clone());
        assert_eq!(
            serde_json::to_string(&first.features).unwrap(),
            serde_json::to_string(&second.features).unwrap()
        );

        let apn_first = clean_apn_dataset(input.clone());
        let apn_second = clean_apn_dataset(input);
        assert_eq!(
            serde_json::to_string(&apn_first.features).unwrap(),
            serde_json::to_string(&apn_second.features).unwrap()
        );
    }
}
