//! Field normalization for raw features
//!
//! Pure functions, no I/O. Every function accepts any JSON value and
//! stringifies it first, so type mismatches in source attributes never
//! produce errors.

use crate::models::Properties;
use serde_json::Value;

/// Parcel identifier (APN) property
pub const IDENTIFIER_FIELD: &str = "PRCL_ID";

/// Fields an address feature must carry, non-empty, to be loaded
pub const REQUIRED_ADDRESS_FIELDS: [&str; 2] = ["ADDR_NBR", "NAME_ROOT"];

/// Ordered components that make up an address string
pub const ADDRESS_KEY_FIELDS: [&str; 6] = [
    "ADDR_NBR",
    "ADDR_STR_NBR",
    "PREFIX",
    "NAME_ROOT",
    "SUFFIX",
    "ADDR_UNIT_NBR",
];

/// Components rewritten in place during address cleaning
pub const STANDARDIZED_FIELDS: [&str; 7] = [
    "ADDR_NBR",
    "PREFIX",
    "NAME_ROOT",
    "SUFFIX",
    "ADDR_UNIT_TYPE",
    "ADDR_UNIT_NBR",
    "ADDR_FLOOR",
];

/// Render an attribute value as text
///
/// Strings are taken verbatim, JSON null becomes the empty string, and every
/// other value uses its JSON rendering (`456` → `"456"`).
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Strip every character that is not an ASCII letter or digit
pub fn clean_identifier(raw: &Value) -> String {
    stringify(raw)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// Collapse whitespace runs, trim, and title-case each word
///
/// Title-casing follows the conventional rule: a letter is upper-cased when
/// it follows a non-letter, lower-cased otherwise (`"o'neil"` → `"O'Neil"`).
pub fn standardize_text_component(raw: &Value) -> String {
    let collapsed = stringify(raw)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    title_case(&collapsed)
}

pub use self::standardize_text_component as standardize_address_component;

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// True iff every required field is present and non-empty after trimming
pub fn is_address_complete(properties: &Properties, required_fields: &[&str]) -> bool {
    required_fields.iter().all(|field| {
        properties
            .get(*field)
            .map(|value| !stringify(value).trim().is_empty())
            .unwrap_or(false)
    })
}

/// Join the standardized, non-empty components of `fields` with single spaces
///
/// Missing fields contribute nothing.
pub fn compose_address(properties: &Properties, fields: &[&str]) -> String {
    fields
        .iter()
        .filter_map(|field| properties.get(*field))
        .map(standardize_text_component)
        .filter(|component| !component.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
