//! Post-load integrity verification
//!
//! A battery of independent read-only checks against the loaded tables.
//! Each check runs its own query; a violated invariant, or a query that
//! fails outright (e.g. a missing table), is recorded and the remaining
//! checks still run. Verification is advisory and never blocks a run.
//!
//! # Checks
//! - Parcel table exists and has rows
//! - Every parcel geometry is valid
//! - Every APN is alphanumeric and unique
//! - parcel_apn rows point at existing parcels and carry the parcel's APN
//! - Address text is never blank
//! - Address rows point at parcels present in both parcel and parcel_apn
//! - One address string maps to one parcel; no (address, parcel) repeats
//! - Address points lie within the tolerance buffer of their parcel

use parcel_common::config::SpatialConfig;
use parcel_common::Result;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};

/// Maximum offending values listed in a diagnostic message
const MAX_LISTED: usize = 10;

/// Outcome of one integrity check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
    pub message: String,
    /// Offending rows or groups (0 when passed)
    pub violations: i64,
}

impl CheckResult {
    fn pass(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            passed: true,
            message: message.into(),
            violations: 0,
        }
    }

    fn fail(name: &'static str, violations: i64, message: impl Into<String>) -> Self {
        Self {
            name,
            passed: false,
            message: message.into(),
            violations,
        }
    }

    /// Pass when `violations` is zero, otherwise fail with `message`
    fn expect_none(name: &'static str, violations: i64, ok: &str, message: &str) -> Self {
        if violations == 0 {
            Self::pass(name, ok)
        } else {
            Self::fail(name, violations, format!("{} ({} found)", message, violations))
        }
    }
}

/// All check outcomes of one verification pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VerificationReport {
    pub checks: Vec<CheckResult>,
}

impl VerificationReport {
    fn record(&mut self, name: &'static str, outcome: Result<CheckResult>) {
        let check = outcome.unwrap_or_else(|e| CheckResult::fail(name, 0, format!("Check could not run: {}", e)));
        if check.passed {
            info!(check = check.name, "Test passed: {}", check.message);
        } else {
            warn!(
                check = check.name,
                violations = check.violations,
                "Test failed: {}",
                check.message
            );
        }
        self.checks.push(check);
    }

    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed)
    }

    pub fn get(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }
}

/// Informational row counts printed after verification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegritySummary {
    pub parcels: i64,
    pub unique_apns: i64,
    pub addresses: i64,
    pub unique_addresses: i64,
    /// Address points strictly contained in their parcel (no buffer)
    pub addresses_within_parcels: i64,
}

pub const PARCEL_TABLE_POPULATED: &str = "parcel_table_populated";
pub const PARCEL_GEOMETRY_VALID: &str = "parcel_geometry_valid";
pub const APN_FORMAT: &str = "apn_format";
pub const APN_UNIQUE: &str = "apn_unique";
pub const IDENTIFIER_TABLE_POPULATED: &str = "identifier_table_populated";
pub const IDENTIFIER_PARCEL_EXISTS: &str = "identifier_parcel_exists";
pub const IDENTIFIER_APN_MATCHES: &str = "identifier_apn_matches";
pub const ADDRESS_TABLE_POPULATED: &str = "address_table_populated";
pub const ADDRESS_NOT_BLANK: &str = "address_not_blank";
pub const ADDRESS_PARCEL_EXISTS: &str = "address_parcel_exists";
pub const ADDRESS_IDENTIFIER_EXISTS: &str = "address_identifier_exists";
pub const ADDRESS_SINGLE_PARCEL: &str = "address_single_parcel";
pub const ADDRESS_PAIR_UNIQUE: &str = "address_pair_unique";
pub const ADDRESS_WITHIN_PARCEL: &str = "address_within_parcel";

/// Runs integrity checks against the loaded tables
pub struct IntegrityVerifier {
    pool: PgPool,
    address_buffer: f64,
}

impl IntegrityVerifier {
    pub fn new(pool: PgPool, spatial: &SpatialConfig) -> Self {
        Self {
            pool,
            address_buffer: spatial.address_buffer,
        }
    }

    /// Run every check in order and collect the outcomes
    pub async fn verify_all(&self) -> VerificationReport {
        let mut report = VerificationReport::default();

        report.record(PARCEL_TABLE_POPULATED, self.table_populated(PARCEL_TABLE_POPULATED, "parcel").await);
        report.record(PARCEL_GEOMETRY_VALID, self.parcel_geometry_valid().await);
        report.record(APN_FORMAT, self.apn_format().await);
        report.record(APN_UNIQUE, self.apn_unique().await);

        report.record(
            IDENTIFIER_TABLE_POPULATED,
            self.table_populated(IDENTIFIER_TABLE_POPULATED, "parcel_apn").await,
        );
        report.record(IDENTIFIER_PARCEL_EXISTS, self.identifier_parcel_exists().await);
        report.record(IDENTIFIER_APN_MATCHES, self.identifier_apn_matches().await);

        report.record(
            ADDRESS_TABLE_POPULATED,
            self.table_populated(ADDRESS_TABLE_POPULATED, "parcel_address").await,
        );
        report.record(ADDRESS_NOT_BLANK, self.address_not_blank().await);
        report.record(ADDRESS_PARCEL_EXISTS, self.address_parcel_exists().await);
        report.record(ADDRESS_IDENTIFIER_EXISTS, self.address_identifier_exists().await);
        report.record(ADDRESS_SINGLE_PARCEL, self.address_single_parcel().await);
        report.record(ADDRESS_PAIR_UNIQUE, self.address_pair_unique().await);
        report.record(ADDRESS_WITHIN_PARCEL, self.address_within_parcel().await);

        let failed = report.failures().count();
        if failed == 0 {
            info!(checks = report.checks.len(), "All integrity checks passed");
        } else {
            warn!(checks = report.checks.len(), failed, "Integrity checks reported failures");
        }
        report
    }

    async fn count(&self, sql: &str) -> Result<i64> {
        Ok(sqlx::query_scalar(sql).fetch_one(&self.pool).await?)
    }

    /// `table` comes from the fixed set of loader tables, never from input
    async fn table_populated(&self, name: &'static str, table: &'static str) -> Result<CheckResult> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name::text = $1)",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await?;
        if !exists {
            return Ok(CheckResult::fail(name, 1, format!("{} table does not exist", table)));
        }

        let rows = self.count(&format!("SELECT COUNT(*) FROM {}", table)).await?;
        if rows > 0 {
            Ok(CheckResult::pass(name, format!("{} table has {} records", table, rows)))
        } else {
            Ok(CheckResult::fail(name, 1, format!("No records found in the {} table", table)))
        }
    }

    async fn parcel_geometry_valid(&self) -> Result<CheckResult> {
        let (total, valid): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE geom IS NOT NULL AND ST_IsValid(geom))
            FROM parcel
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(CheckResult::expect_none(
            PARCEL_GEOMETRY_VALID,
            total - valid,
            "All parcel geometries are valid",
            "Invalid geometries found in the parcel table",
        ))
    }

    async fn apn_format(&self) -> Result<CheckResult> {
        let violations = self
            .count("SELECT COUNT(*) FROM parcel WHERE apn IS NULL OR apn !~* '^[a-z0-9]+$'")
            .await?;
        Ok(CheckResult::expect_none(
            APN_FORMAT,
            violations,
            "All APNs are alphanumeric",
            "APNs with invalid format found",
        ))
    }

    async fn apn_unique(&self) -> Result<CheckResult> {
        let violations = self
            .count("SELECT COUNT(*) FROM (SELECT apn FROM parcel GROUP BY apn HAVING COUNT(*) > 1) d")
            .await?;
        Ok(CheckResult::expect_none(
            APN_UNIQUE,
            violations,
            "All APNs are unique",
            "Duplicate APNs found",
        ))
    }

    async fn identifier_parcel_exists(&self) -> Result<CheckResult> {
        let violations = self
            .count(
                r#"
                SELECT COUNT(*)
                FROM parcel_apn pa
                LEFT JOIN parcel p ON pa.parcel_id = p.id
                WHERE p.id IS NULL
                "#,
            )
            .await?;
        Ok(CheckResult::expect_none(
            IDENTIFIER_PARCEL_EXISTS,
            violations,
            "Every parcel_apn row references an existing parcel",
            "parcel_apn table contains parcel_id values that do not exist in the parcel table",
        ))
    }

    async fn identifier_apn_matches(&self) -> Result<CheckResult> {
        let violations = self
            .count(
                r#"
                SELECT COUNT(*)
                FROM parcel_apn pa
                JOIN parcel p ON pa.parcel_id = p.id
                WHERE pa.apn <> p.apn
                "#,
            )
            .await?;
        Ok(CheckResult::expect_none(
            IDENTIFIER_APN_MATCHES,
            violations,
            "Every parcel_apn APN matches its parcel",
            "APNs in parcel_apn table do not match the corresponding APNs in the parcel table",
        ))
    }

    async fn address_not_blank(&self) -> Result<CheckResult> {
        let violations = self
            .count("SELECT COUNT(*) FROM parcel_address WHERE trim(address) = ''")
            .await?;
        Ok(CheckResult::expect_none(
            ADDRESS_NOT_BLANK,
            violations,
            "No blank addresses",
            "Incomplete addresses found",
        ))
    }

    async fn address_parcel_exists(&self) -> Result<CheckResult> {
        let violations = self
            .count(
                r#"
                SELECT COUNT(*)
                FROM parcel_address pa
                LEFT JOIN parcel p ON pa.parcel_id = p.id
                WHERE p.id IS NULL
                "#,
            )
            .await?;
        Ok(CheckResult::expect_none(
            ADDRESS_PARCEL_EXISTS,
            violations,
            "Every address references an existing parcel",
            "Orphan addresses found without an associated parcel",
        ))
    }

    async fn address_identifier_exists(&self) -> Result<CheckResult> {
        let violations = self
            .count(
                r#"
                SELECT COUNT(*)
                FROM parcel_address pa
                WHERE NOT EXISTS (
                    SELECT 1 FROM parcel_apn papn WHERE papn.parcel_id = pa.parcel_id
                )
                "#,
            )
            .await?;
        Ok(CheckResult::expect_none(
            ADDRESS_IDENTIFIER_EXISTS,
            violations,
            "Every address parcel has an APN row",
            "parcel_address table contains parcel_id values without associated APNs in parcel_apn",
        ))
    }

    async fn address_single_parcel(&self) -> Result<CheckResult> {
        let shared: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT address, COUNT(DISTINCT parcel_id)
            FROM parcel_address
            GROUP BY address
            HAVING COUNT(DISTINCT parcel_id) > 1
            ORDER BY address
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        if shared.is_empty() {
            return Ok(CheckResult::pass(
                ADDRESS_SINGLE_PARCEL,
                "Every address belongs to a single parcel",
            ));
        }

        let listed = shared
            .iter()
            .take(MAX_LISTED)
            .map(|(address, parcels)| format!("{} ({} parcels)", address, parcels))
            .collect::<Vec<_>>()
            .join("; ");
        Ok(CheckResult::fail(
            ADDRESS_SINGLE_PARCEL,
            shared.len() as i64,
            format!("Addresses found associated with multiple parcels: {}", listed),
        ))
    }

    async fn address_pair_unique(&self) -> Result<CheckResult> {
        let violations = self
            .count(
                r#"
                SELECT COUNT(*)
                FROM (
                    SELECT address, parcel_id
                    FROM parcel_address
                    GROUP BY address, parcel_id
                    HAVING COUNT(*) > 1
                ) duplicates
                "#,
            )
            .await?;
        Ok(CheckResult::expect_none(
            ADDRESS_PAIR_UNIQUE,
            violations,
            "No duplicate addresses within a parcel",
            "Duplicate addresses found within the same parcel",
        ))
    }

    async fn address_within_parcel(&self) -> Result<CheckResult> {
        let violations: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM parcel_address pa
            JOIN parcel p ON pa.parcel_id = p.id
            WHERE pa.geom IS NOT NULL
              AND p.geom IS NOT NULL
              AND NOT ST_Within(pa.geom, ST_Buffer(p.geom, $1))
            "#,
        )
        .bind(self.address_buffer)
        .fetch_one(&self.pool)
        .await?;

        Ok(CheckResult::expect_none(
            ADDRESS_WITHIN_PARCEL,
            violations,
            &format!("All address points lie within {} of their parcel", self.address_buffer),
            &format!(
                "Address geometries found outside of their associated parcels (buffer {})",
                self.address_buffer
            ),
        ))
    }
}

/// Informational counts over the loaded tables
///
/// Containment here is strict (`ST_Contains`, no buffer), so it can be lower
/// than what [`IntegrityVerifier::verify_all`] accepts.
pub async fn integrity_summary(pool: &PgPool) -> Result<IntegritySummary> {
    let (parcels, unique_apns): (i64, i64) =
        sqlx::query_as("SELECT COUNT(*), COUNT(DISTINCT apn) FROM parcel")
            .fetch_one(pool)
            .await?;
    info!("Parcel Table: {} records, {} unique APNs", parcels, unique_apns);

    let (addresses, unique_addresses): (i64, i64) =
        sqlx::query_as("SELECT COUNT(*), COUNT(DISTINCT address) FROM parcel_address")
            .fetch_one(pool)
            .await?;
    info!(
        "Address Table: {} records, {} unique addresses",
        addresses, unique_addresses
    );

    let addresses_within_parcels: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM parcel_address pa
        JOIN parcel p ON pa.parcel_id = p.id
        WHERE ST_Contains(p.geom, pa.geom)
        "#,
    )
    .fetch_one(pool)
    .await?;
    info!("Addresses correctly located within parcels: {}", addresses_within_parcels);

    Ok(IntegritySummary {
        parcels,
        unique_apns,
        addresses,
        unique_addresses,
        addresses_within_parcels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcel_common::Error;

    #[test]
    fn test_expect_none_passes_on_zero() {
        let check = CheckResult::expect_none(APN_UNIQUE, 0, "ok", "dupes");
        assert!(check.passed);
        assert_eq!(check.message, "ok");
    }

    #[test]
    fn test_expect_none_fails_with_count() {
        let check = CheckResult::expect_none(APN_UNIQUE, 3, "ok", "Duplicate APNs found");
        assert!(!check.passed);
        assert_eq!(check.violations, 3);
        assert_eq!(check.message, "Duplicate APNs found (3 found)");
    }

    #[test]
    fn test_query_error_is_recorded_and_later_checks_still_recorded() {
        let mut report = VerificationReport::default();
        report.record(APN_FORMAT, Err(Error::Internal("relation \"parcel\" does not exist".to_string())));
        report.record(APN_UNIQUE, Ok(CheckResult::pass(APN_UNIQUE, "All APNs are unique")));

        assert_eq!(report.checks.len(), 2);
        assert!(!report.all_passed());
        let failed: Vec<_> = report.failures().map(|c| c.name).collect();
        assert_eq!(failed, vec![APN_FORMAT]);
        assert!(report.get(APN_FORMAT).unwrap().message.contains("does not exist"));
    }
}
