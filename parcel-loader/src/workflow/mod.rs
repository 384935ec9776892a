//! Run orchestration
//!
//! One run is a fixed, strictly sequential list of stages on a single
//! database connection:
//!
//! 1. Provision the database and schema (best-effort)
//! 2. Fetch both layers with bounded retry and persist them raw
//! 3. Clean both datasets and persist the cleaned collections
//! 4. Advisory dataset verification
//! 5. Load parcels, repair geometry, derive identifiers, load addresses
//! 6. Integrity verification and summary

pub mod pipeline;

pub use pipeline::{load_and_verify, prepare_datasets, run, LoadReport, PreparedDatasets, RunReport};
