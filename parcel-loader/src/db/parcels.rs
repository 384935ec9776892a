//! Parcel loading
//!
//! Insert uses "skip on identifier collision": the first feature carrying a
//! given APN wins and later ones are silently dropped by the unique
//! constraint, independent of any cleaning-stage dedup.

use crate::db::SpatialStore;
use crate::models::{ParcelLoadReport, RawFeature};
use crate::services::normalizer::{stringify, IDENTIFIER_FIELD};
use parcel_common::Result;
use tracing::{debug, info};

impl SpatialStore {
    /// Insert parcel features, skipping identifier collisions
    ///
    /// Polygons are promoted to multi-polygons on the way in. Geometry is
    /// stored as given (possibly invalid); [`SpatialStore::repair_invalid_geometries`]
    /// must run next. Features without an identifier are not inserted.
    ///
    /// A database error aborts the whole load and nothing is committed.
    pub async fn insert_parcels(&self, features: &[RawFeature]) -> Result<ParcelLoadReport> {
        let mut report = ParcelLoadReport {
            attempted: features.len(),
            ..Default::default()
        };

        let mut tx = self.pool().begin().await?;

        for feature in features {
            let apn = feature
                .properties
                .get(IDENTIFIER_FIELD)
                .map(stringify)
                .unwrap_or_default();
            if apn.is_empty() {
                report.skipped_missing_identifier += 1;
                continue;
            }

            let result = sqlx::query(
                r#"
                INSERT INTO parcel (geom, apn)
                VALUES (ST_Multi(ST_SetSRID(ST_GeomFromGeoJSON($1::text), $2)), $3)
                ON CONFLICT (apn) DO NOTHING
                "#,
            )
            .bind(feature.geometry_json())
            .bind(self.srid())
            .bind(&apn)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 1 {
                report.inserted += 1;
            } else {
                debug!(apn = %apn, "Parcel identifier already loaded, skipping");
                report.skipped_conflict += 1;
            }
        }

        tx.commit().await?;

        info!(
            attempted = report.attempted,
            inserted = report.inserted,
            conflicts = report.skipped_conflict,
            missing_identifier = report.skipped_missing_identifier,
            "Uploaded parcel data to the database"
        );
        Ok(report)
    }

    /// Number of parcel rows
    pub async fn count_parcels(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM parcel")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}
