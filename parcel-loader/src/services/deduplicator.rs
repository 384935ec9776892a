//! Duplicate feature detection
//!
//! Identity is the upper-cased address text plus the raw coordinate text of
//! the geometry. Two features collide only when both are byte-identical, so
//! the same point written with different precision or vertex order is not a
//! duplicate.

use crate::models::Properties;
use crate::services::normalizer::compose_address;
use serde_json::Value;
use std::collections::HashSet;

/// Stands in for the coordinate text when a feature has no coordinates
pub const NO_COORDINATES: &str = "NO_COORDINATES";

/// Composite identity key: `"<ADDRESS TEXT>_<coordinates>"`
///
/// Components are standardized first, so whitespace runs inside a component
/// do not distinguish keys.
pub fn identity_key(properties: &Properties, geometry: Option<&Value>, key_fields: &[&str]) -> String {
    let full_address = compose_address(properties, key_fields).to_uppercase();
    format!("{}_{}", full_address, coordinate_text(geometry))
}

fn coordinate_text(geometry: Option<&Value>) -> String {
    geometry
        .and_then(|g| g.get("coordinates"))
        .filter(|coords| match coords {
            Value::Null => false,
            Value::Array(items) => !items.is_empty(),
            _ => true,
        })
        .map(Value::to_string)
        .unwrap_or_else(|| NO_COORDINATES.to_string())
}

/// Keep the first item for each key, drop later ones
///
/// Order-preserving. Returns the kept items and the number dropped.
pub fn dedupe<T, F>(items: Vec<T>, key_fn: F) -> (Vec<T>, usize)
where
    F: Fn(&T) -> String,
{
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(items.len());
    let mut dropped = 0;

    for item in items {
        if seen.insert(key_fn(&item)) {
            kept.push(item);
        } else {
            dropped += 1;
        }
    }

    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::normalizer::ADDRESS_KEY_FIELDS;
    use serde_json::json;

    fn props(value: Value) -> Properties {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_identity_key_upper_cases_address_and_appends_coordinates() {
        let properties = props(json!({"ADDR_NBR": "123", "NAME_ROOT": "main", "SUFFIX": "st"}));
        let geometry = json!({"type": "MultiPoint", "coordinates": [[-120.5, 38.7]]});

        assert_eq!(
            identity_key(&properties, Some(&geometry), &ADDRESS_KEY_FIELDS),
            "123 MAIN ST_[[-120.5,38.7]]"
        );
    }

    #[test]
    fn test_identity_key_without_coordinates() {
        let properties = props(json!({"ADDR_NBR": "9", "NAME_ROOT": "Oak"}));
        assert_eq!(identity_key(&properties, None, &ADDRESS_KEY_FIELDS), "9 OAK_NO_COORDINATES");

        let empty = json!({"type": "Point", "coordinates": []});
        assert_eq!(
            identity_key(&properties, Some(&empty), &ADDRESS_KEY_FIELDS),
            "9 OAK_NO_COORDINATES"
        );
    }

    #[test]
    fn test_coordinate_precision_changes_identity() {
        let properties = props(json!({"ADDR_NBR": "1", "NAME_ROOT": "Elm"}));
        let a = json!({"coordinates": [-120.5, 38.7]});
        let b = json!({"coordinates": [-120.50001, 38.7]});
        assert_ne!(
            identity_key(&properties, Some(&a), &ADDRESS_KEY_FIELDS),
            identity_key(&properties, Some(&b), &ADDRESS_KEY_FIELDS)
        );
    }

    #[test]
    fn test_identity_key_ignores_spacing_inside_components() {
        let geometry = json!({"coordinates": [-120.5, 38.7]});
        let wide = props(json!({"ADDR_NBR": "1", "ADDR_STR_NBR": "1  A", "NAME_ROOT": "Elm", "SUFFIX": null}));
        let narrow = props(json!({"ADDR_NBR": "1", "ADDR_STR_NBR": "1 A", "NAME_ROOT": "Elm"}));

        let key = identity_key(&wide, Some(&geometry), &ADDRESS_KEY_FIELDS);
        assert_eq!(key, "1 1 A ELM_[-120.5,38.7]");
        assert_eq!(key, identity_key(&narrow, Some(&geometry), &ADDRESS_KEY_FIELDS));
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let items = vec![("a", 1), ("b", 2), ("a", 3), ("c", 4), ("b", 5)];
        let (kept, dropped) = dedupe(items, |(key, _)| key.to_string());

        assert_eq!(kept, vec![("a", 1), ("b", 2), ("c", 4)]);
        assert_eq!(dropped, 2);
    }

    #[test]
    fn test_dedupe_empty_input() {
        let (kept, dropped) = dedupe(Vec::<String>::new(), |s| s.clone());
        assert!(kept.is_empty());
        assert_eq!(dropped, 0);
    }
}
