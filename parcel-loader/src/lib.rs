//! parcel-loader library interface
//!
//! Normalizes raw parcel and address features, loads them into a PostGIS
//! store, repairs or discards invalid parcel geometries, and verifies the
//! loaded data.
//!
//! Stages, in call order:
//! 1. [`sources`]: fetch raw features for a layer (with bounded retry)
//! 2. [`services`]: normalize and deduplicate feature collections
//! 3. [`db`]: parcel load, geometry repair, identifier fan-out, address load
//! 4. [`validators`]: dataset and post-load integrity checks
//!
//! [`workflow`] runs the stages one after another.

pub mod db;
pub mod models;
pub mod services;
pub mod sources;
pub mod validators;
pub mod workflow;

pub use db::SpatialStore;
pub use models::{FeatureCollection, RawFeature};
