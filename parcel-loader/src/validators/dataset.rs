//! Pre-load checks over cleaned feature collections

use crate::models::RawFeature;
use crate::services::deduplicator::identity_key;
use crate::services::normalizer::{compose_address, stringify, ADDRESS_KEY_FIELDS, IDENTIFIER_FIELD};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Findings for one cleaned collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatasetReport {
    pub total: usize,
    pub issues: usize,
    pub details: Vec<String>,
}

impl DatasetReport {
    fn issue(&mut self, detail: String) {
        warn!("{}", detail);
        self.issues += 1;
        self.details.push(detail);
    }

    fn log_summary(&self, dataset: &str) {
        info!(
            dataset,
            "Verification completed. Total features checked: {}, Issues found: {}",
            self.total,
            self.issues
        );
    }
}

/// Flag features with no address text, and identity keys that still repeat
pub fn verify_cleaned_addresses(features: &[RawFeature]) -> DatasetReport {
    let mut report = DatasetReport {
        total: features.len(),
        ..Default::default()
    };
    // identity key -> (address text, occurrences)
    let mut occurrences: BTreeMap<String, (String, usize)> = BTreeMap::new();

    for (index, feature) in features.iter().enumerate() {
        let full_address = compose_address(&feature.properties, &ADDRESS_KEY_FIELDS).to_uppercase();
        if full_address.is_empty() {
            report.issue(format!("Issue found in feature {}: Incomplete address", index + 1));
            continue;
        }

        let key = identity_key(&feature.properties, feature.geometry.as_ref(), &ADDRESS_KEY_FIELDS);
        occurrences
            .entry(key)
            .or_insert_with(|| (full_address, 0))
            .1 += 1;
    }

    for (address, count) in occurrences.into_values().filter(|(_, count)| *count > 1) {
        report.issue(format!(
            "Duplicate address with identical geo data: '{}' occurs {} times",
            address, count
        ));
    }

    report.log_summary("addresses");
    report
}

/// Flag identifiers containing anything but ASCII letters and digits
pub fn verify_cleaned_apns(features: &[RawFeature]) -> DatasetReport {
    let mut report = DatasetReport {
        total: features.len(),
        ..Default::default()
    };

    for (index, feature) in features.iter().enumerate() {
        let apn = feature
            .properties
            .get(IDENTIFIER_FIELD)
            .map(stringify)
            .unwrap_or_default();
        if !apn.chars().all(|c| c.is_ascii_alphanumeric()) {
            report.issue(format!(
                "Issue found in feature {}: Non-standard APN '{}'",
                index + 1,
                apn
            ));
        }
    }

    report.log_summary("parcels");
    report
}
