//! Identifier fan-out
//!
//! parcel_apn mirrors (id, apn) of every surviving parcel so address loading
//! can join on APN without touching the geometry column.

use crate::db::SpatialStore;
use parcel_common::Result;
use tracing::info;

impl SpatialStore {
    /// Copy (id, apn) of every parcel into parcel_apn
    ///
    /// Must run after the repair pass so only surviving parcels are copied.
    /// Parcels that already have an identifier row are skipped, so a re-run
    /// adds nothing.
    pub async fn populate_identifiers(&self) -> Result<u64> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO parcel_apn (parcel_id, apn)
            SELECT p.id, p.apn
            FROM parcel p
            WHERE p.apn IS NOT NULL
              AND NOT EXISTS (
                  SELECT 1 FROM parcel_apn pa WHERE pa.parcel_id = p.id
              )
            "#,
        )
        .execute(self.pool())
        .await?
        .rows_affected();

        info!(rows = inserted, "Parcel APN table populated successfully");
        Ok(inserted)
    }
}
