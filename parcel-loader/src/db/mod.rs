//! Spatial store: parcel, parcel_apn and parcel_address persistence
//!
//! Geometry work (GeoJSON parsing, validity, make-valid repair, buffers) is
//! delegated to PostGIS. Operations must be called in this order:
//! 1. [`SpatialStore::insert_parcels`]
//! 2. [`SpatialStore::repair_invalid_geometries`]
//! 3. [`SpatialStore::report_geometry_issues`] (diagnostic, optional)
//! 4. [`SpatialStore::populate_identifiers`]
//! 5. [`SpatialStore::insert_addresses`]
//!
//! The store assumes it is the only writer. The address-uniqueness pre-check
//! and the insert that follows it are separate statements; running two
//! stores against the same tables concurrently would race between them.

pub mod addresses;
pub mod identifiers;
pub mod parcels;
pub mod repair;

use parcel_common::config::SpatialConfig;
use sqlx::PgPool;

/// PostGIS-backed parcel store
#[derive(Debug, Clone)]
pub struct SpatialStore {
    pool: PgPool,
    srid: i32,
}

impl SpatialStore {
    pub fn new(pool: PgPool, spatial: &SpatialConfig) -> Self {
        Self {
            pool,
            srid: spatial.srid,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn srid(&self) -> i32 {
        self.srid
    }
}
