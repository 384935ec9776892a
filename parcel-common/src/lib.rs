//! # Parcel Common Library
//!
//! Shared code for the parcel loading tools:
//! - Error and result types
//! - Configuration loading and override resolution
//! - Database connection, provisioning and schema creation

pub mod config;
pub mod db;
pub mod error;

pub use config::LoaderConfig;
pub use error::{Error, Result};
