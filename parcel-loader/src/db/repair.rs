//! Invalid geometry repair
//!
//! Repair-or-discard: every parcel whose geometry is invalid (or missing)
//! is run through make-valid, reduced to its polygonal part, and forced to
//! a multi-polygon. If that yields nothing usable the parcel row is deleted,
//! cascading to any identifier and address rows.
//!
//! Each parcel is handled in its own transaction, so a failure on one row
//! never rolls back work already done on another. The pass is re-runnable:
//! a second run finds nothing to examine.

use crate::db::SpatialStore;
use crate::models::{GeometryIssues, RepairReport};
use parcel_common::Result;
use tracing::{debug, info, warn};
use uuid::Uuid;

impl SpatialStore {
    /// Repair invalid parcel geometries, deleting those that cannot be repaired
    pub async fn repair_invalid_geometries(&self) -> Result<RepairReport> {
        let invalid_ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM parcel WHERE geom IS NULL OR NOT ST_IsValid(geom)",
        )
        .fetch_all(self.pool())
        .await?;

        let mut report = RepairReport {
            examined: invalid_ids.len(),
            ..Default::default()
        };

        for parcel_id in invalid_ids {
            let mut tx = self.pool().begin().await?;

            let updated = sqlx::query(
                r#"
                WITH corrected AS (
                    SELECT ST_CollectionExtract(ST_MakeValid(geom), 3) AS geom
                    FROM parcel WHERE id = $1
                ), multi AS (
                    SELECT ST_Multi(geom) AS geom FROM corrected
                    WHERE geom IS NOT NULL AND NOT ST_IsEmpty(geom)
                )
                UPDATE parcel
                SET geom = (SELECT geom FROM multi)
                WHERE id = $1 AND (SELECT geom FROM multi) IS NOT NULL
                "#,
            )
            .bind(parcel_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            let deleted = sqlx::query(
                r#"
                DELETE FROM parcel
                WHERE id = $1
                  AND (geom IS NULL OR ST_IsEmpty(geom) OR NOT ST_IsValid(geom))
                "#,
            )
            .bind(parcel_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            tx.commit().await?;

            if deleted > 0 {
                debug!(parcel_id = %parcel_id, "Dropped parcel with unrepairable geometry");
                report.deleted += 1;
            } else if updated > 0 {
                debug!(parcel_id = %parcel_id, "Repaired parcel geometry");
                report.repaired += 1;
            }
        }

        info!(
            examined = report.examined,
            repaired = report.repaired,
            deleted = report.deleted,
            "Finished processing invalid geometries"
        );
        Ok(report)
    }

    /// Count remaining invalid geometries and geometry collections
    ///
    /// Read-only; both counts should be zero after a repair pass.
    pub async fn report_geometry_issues(&self) -> Result<GeometryIssues> {
        let invalid: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM parcel WHERE NOT ST_IsValid(geom)")
                .fetch_one(self.pool())
                .await?;

        let geometry_collections: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM parcel WHERE GeometryType(geom) = 'GEOMETRYCOLLECTION'",
        )
        .fetch_one(self.pool())
        .await?;

        if invalid == 0 {
            info!("No invalid geometries found");
        } else {
            warn!("Found {} invalid geometries", invalid);
        }
        if geometry_collections == 0 {
            info!("No GeometryCollection types found");
        } else {
            warn!("Found {} GeometryCollection types", geometry_collections);
        }

        Ok(GeometryIssues {
            invalid,
            geometry_collections,
        })
    }
}
