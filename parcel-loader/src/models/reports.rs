//! Per-stage result counters
//!
//! Each store operation returns one of these so the run can log what
//! happened without any stage raising for expected skips.

use serde::Serialize;

/// Outcome of loading parcel features
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParcelLoadReport {
    pub attempted: usize,
    pub inserted: usize,
    /// Identifier already present; first writer wins
    pub skipped_conflict: usize,
    /// No usable identifier on the feature
    pub skipped_missing_identifier: usize,
}

/// Outcome of the repair-or-discard pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub examined: usize,
    pub repaired: usize,
    pub deleted: usize,
}

/// Read-only geometry diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeometryIssues {
    pub invalid: i64,
    pub geometry_collections: i64,
}

impl GeometryIssues {
    pub fn is_clean(&self) -> bool {
        self.invalid == 0 && self.geometry_collections == 0
    }
}

/// Outcome of loading address features
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddressLoadReport {
    pub attempted: usize,
    pub inserted: usize,
    /// Empty address text or empty parcel identifier
    pub skipped_incomplete: usize,
    /// Address text already linked to some parcel
    pub skipped_existing: usize,
    /// Identifier matched no parcel (or the pair already existed)
    pub unresolved: usize,
}
