//! Data-quality verification
//!
//! - [`dataset`]: advisory checks over cleaned feature collections, before load
//! - [`integrity`]: post-load invariant checks against the store
//!
//! Verification never mutates data and never raises for a violated
//! invariant: every check reports its outcome and the next one runs.

pub mod dataset;
pub mod integrity;

pub use dataset::{verify_cleaned_addresses, verify_cleaned_apns, DatasetReport};
pub use integrity::{integrity_summary, CheckResult, IntegritySummary, IntegrityVerifier, VerificationReport};
