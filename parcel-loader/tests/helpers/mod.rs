//! Test Helper Utilities
//!
//! Shared utilities for testing parcel-loader

#![allow(dead_code, unused_imports)]

pub mod db_utils;
pub mod features;

pub use db_utils::{reset_tables, test_pool, test_store};
pub use features::{address_feature, parcel_feature, square, BOWTIE};
