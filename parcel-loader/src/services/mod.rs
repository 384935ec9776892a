//! Feature cleaning services
//!
//! - [`normalizer`]: per-field identifier and address text cleanup
//! - [`deduplicator`]: identity keys and first-wins duplicate removal
//! - [`dataset_pipeline`]: both applied over a whole collection

pub mod dataset_pipeline;
pub mod deduplicator;
pub mod normalizer;

pub use dataset_pipeline::{clean_address_dataset, clean_apn_dataset, CleanReport};
pub use deduplicator::{dedupe, identity_key, NO_COORDINATES};
pub use normalizer::{
    clean_identifier, compose_address, is_address_complete, standardize_address_component,
    standardize_text_component, stringify,
};
