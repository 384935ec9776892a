//! Data models for parcel loading

pub mod feature;
pub mod reports;

pub use feature::{FeatureCollection, Properties, RawFeature};
pub use reports::{AddressLoadReport, GeometryIssues, ParcelLoadReport, RepairReport};
