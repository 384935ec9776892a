//! Address loading
//!
//! An address string belongs to exactly one parcel. Before inserting, the
//! table is checked for the same address under any parcel and the feature is
//! skipped if found. The insert itself resolves `parcel_id` by joining
//! parcel_apn on the feature's APN, so an unknown APN inserts nothing.

use crate::db::SpatialStore;
use crate::models::{AddressLoadReport, RawFeature};
use crate::services::normalizer::{compose_address, stringify, ADDRESS_KEY_FIELDS, IDENTIFIER_FIELD};
use parcel_common::Result;
use tracing::{debug, info};

impl SpatialStore {
    /// Insert cleaned address features linked to their parcels
    ///
    /// A database error aborts the whole load and nothing is committed.
    pub async fn insert_addresses(&self, features: &[RawFeature]) -> Result<AddressLoadReport> {
        let mut report = AddressLoadReport {
            attempted: features.len(),
            ..Default::default()
        };

        let mut tx = self.pool().begin().await?;

        for feature in features {
            let address = compose_address(&feature.properties, &ADDRESS_KEY_FIELDS);
            let apn = feature
                .properties
                .get(IDENTIFIER_FIELD)
                .map(stringify)
                .unwrap_or_default();

            if address.is_empty() || apn.is_empty() {
                report.skipped_incomplete += 1;
                continue;
            }

            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM parcel_address WHERE address = $1)")
                    .bind(&address)
                    .fetch_one(&mut *tx)
                    .await?;
            if exists {
                debug!(address = %address, "Address already linked to a parcel, skipping");
                report.skipped_existing += 1;
                continue;
            }

            let inserted = sqlx::query(
                r#"
                INSERT INTO parcel_address (parcel_id, address, geom)
                SELECT papn.parcel_id, $1, ST_SetSRID(ST_GeomFromGeoJSON($2::text), $3)
                FROM parcel_apn papn
                WHERE papn.apn = $4
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(&address)
            .bind(feature.geometry_json())
            .bind(self.srid())
            .bind(&apn)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if inserted > 0 {
                report.inserted += 1;
            } else {
                debug!(apn = %apn, address = %address, "No parcel for address identifier");
                report.unresolved += 1;
            }
        }

        tx.commit().await?;

        info!(
            attempted = report.attempted,
            inserted = report.inserted,
            incomplete = report.skipped_incomplete,
            existing = report.skipped_existing,
            unresolved = report.unresolved,
            "Addresses uploaded and associated with parcels by APN"
        );
        Ok(report)
    }
}
