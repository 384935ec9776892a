//! Stage sequencing for a full load
//!
//! Stages are awaited one after another; nothing is spawned. Provisioning,
//! connection and schema failures and failed fetches are logged and the run
//! continues with what it has. Load stages propagate their errors, since continuing past a failed
//! insert would only produce misleading verification output.

use crate::db::SpatialStore;
use crate::models::{
    AddressLoadReport, FeatureCollection, GeometryIssues, ParcelLoadReport, RawFeature, RepairReport,
};
use crate::services::{clean_address_dataset, clean_apn_dataset, CleanReport};
use crate::sources::{fetch_with_retry, source_for, FetchReport, LayerRef, RetryPolicy};
use crate::validators::{
    integrity_summary, verify_cleaned_addresses, verify_cleaned_apns, DatasetReport,
    IntegritySummary, IntegrityVerifier, VerificationReport,
};
use chrono::{DateTime, Utc};
use parcel_common::config::LoaderConfig;
use parcel_common::db::{connect, create_schema, ensure_database, StepOutcome};
use parcel_common::Result;
use serde::Serialize;
use sqlx::PgPool;
use std::path::Path;
use tracing::{info, warn};

pub const PARCEL_LAYER: &str = "parcels";
pub const ADDRESS_LAYER: &str = "addresses";

/// Cleaned collections ready for loading, with the preparation diagnostics
#[derive(Debug, Clone)]
pub struct PreparedDatasets {
    pub parcels_fetched: bool,
    pub addresses_fetched: bool,
    pub parcels: CleanReport,
    pub addresses: CleanReport,
    pub parcel_check: DatasetReport,
    pub address_check: DatasetReport,
}

/// What the load and verification stages did
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub parcels: ParcelLoadReport,
    pub repair: RepairReport,
    pub remaining_issues: GeometryIssues,
    pub identifiers: u64,
    pub addresses: AddressLoadReport,
    pub verification: VerificationReport,
    pub summary: Option<IntegritySummary>,
}

/// Everything a completed run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub database: StepOutcome,
    pub connection: StepOutcome,
    pub schema: StepOutcome,
    pub prepared: PreparedDatasets,
    pub load: LoadReport,
}

impl RunReport {
    /// True when provisioning worked and every integrity check passed
    pub fn is_clean(&self) -> bool {
        self.database.is_success()
            && self.connection.is_success()
            && self.schema.is_success()
            && self.load.verification.all_passed()
    }
}

/// Execute a full run with the given configuration
///
/// Provisioning, the first connection and schema setup are best-effort: a
/// failure there is recorded and the download and cleaning stages still run
/// and write their files. The load stage then reconnects if needed and fails
/// loudly when the database is still unreachable.
pub async fn run(config: &LoaderConfig) -> Result<RunReport> {
    let started_at = Utc::now();
    std::fs::create_dir_all(&config.output.directory)?;

    let database = ensure_database(&config.database).await;
    let (pool, connection) = StepOutcome::capture("connect", connect(&config.database).await);
    let schema = match &pool {
        Some(pool) => create_schema(pool, config.spatial.srid).await,
        None => StepOutcome::Failed {
            message: "skipped: no database connection".to_string(),
        },
    };

    let prepared = prepare_datasets(config).await?;

    let pool = match pool {
        Some(pool) => pool,
        None => {
            warn!("Reconnecting to the database for the load stage");
            connect(&config.database).await?
        }
    };
    let load = load_and_verify(pool.clone(), config, &prepared).await;
    pool.close().await;
    let load = load?;

    let report = RunReport {
        started_at,
        finished_at: Utc::now(),
        database,
        connection,
        schema,
        prepared,
        load,
    };
    let elapsed = report.finished_at - report.started_at;
    if report.is_clean() {
        info!(elapsed_secs = elapsed.num_seconds(), "Run completed; all integrity checks passed");
    } else {
        warn!("Run completed with failed steps or checks; see log above");
    }
    Ok(report)
}

/// Fetch, persist, clean and check both layers
///
/// Raw collections are written before cleaning, so a failed clean still
/// leaves the downloaded data on disk.
pub async fn prepare_datasets(config: &LoaderConfig) -> Result<PreparedDatasets> {
    let policy = RetryPolicy::from(&config.source);
    let srid = config.spatial.srid;

    let parcels = fetch_layer(config, &LayerRef::new(PARCEL_LAYER, &config.layers.parcels), &policy, srid).await?;
    let addresses =
        fetch_layer(config, &LayerRef::new(ADDRESS_LAYER, &config.layers.addresses), &policy, srid).await?;

    write_collection(&parcels.features, &config.output.raw_parcels_path())?;
    write_collection(&addresses.features, &config.output.raw_addresses_path())?;

    let cleaned_addresses = clean_address_dataset(addresses.features);
    let cleaned_parcels = clean_apn_dataset(parcels.features);

    write_collection(&cleaned_addresses.features, &config.output.cleaned_addresses_path())?;
    write_collection(&cleaned_parcels.features, &config.output.standardized_parcels_path())?;

    let address_check = verify_cleaned_addresses(&cleaned_addresses.features);
    let parcel_check = verify_cleaned_apns(&cleaned_parcels.features);

    Ok(PreparedDatasets {
        parcels_fetched: parcels.succeeded,
        addresses_fetched: addresses.succeeded,
        parcels: cleaned_parcels,
        addresses: cleaned_addresses,
        parcel_check,
        address_check,
    })
}

async fn fetch_layer(config: &LoaderConfig, layer: &LayerRef, policy: &RetryPolicy, srid: i32) -> Result<FetchReport> {
    let source = source_for(layer, &config.source, srid)?;
    let report = fetch_with_retry(source.as_ref(), layer, policy).await;
    if !report.succeeded {
        warn!(layer = %layer.name, "Continuing with an empty {} dataset", layer.name);
    }
    Ok(report)
}

fn write_collection(features: &[RawFeature], path: &Path) -> Result<()> {
    FeatureCollection::new(features.to_vec()).write_to(path)
}

/// Load prepared datasets into the store, then verify and summarize
///
/// Order matters: identifiers are derived only after repair has deleted
/// unrepairable parcels, and addresses resolve through those identifiers.
pub async fn load_and_verify(pool: PgPool, config: &LoaderConfig, prepared: &PreparedDatasets) -> Result<LoadReport> {
    let store = SpatialStore::new(pool.clone(), &config.spatial);

    let parcels = store.insert_parcels(&prepared.parcels.features).await?;
    let repair = store.repair_invalid_geometries().await?;
    let remaining_issues = store.report_geometry_issues().await?;
    let identifiers = store.populate_identifiers().await?;
    let addresses = store.insert_addresses(&prepared.addresses.features).await?;

    let verification = IntegrityVerifier::new(pool.clone(), &config.spatial).verify_all().await;
    let summary = match integrity_summary(&pool).await {
        Ok(summary) => Some(summary),
        Err(e) => {
            warn!("Integrity summary unavailable: {}", e);
            None
        }
    };

    Ok(LoadReport {
        parcels,
        repair,
        remaining_issues,
        identifiers,
        addresses,
        verification,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_layer(dir: &Path, name: &str, features: Vec<serde_json::Value>) -> String {
        let path = dir.join(name);
        let doc = json!({ "type": "FeatureCollection", "features": features });
        std::fs::write(&path, doc.to_string()).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_prepare_datasets_from_files() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();

        let parcels = write_layer(
            input.path(),
            "parcels.json",
            vec![json!({
                "type": "Feature",
                "properties": { "PRCL_ID": "001-02-3" },
                "geometry": { "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]] }
            })],
        );
        let point = json!({ "type": "Point", "coordinates": [0.5, 0.5] });
        let addresses = write_layer(
            input.path(),
            "addresses.json",
            vec![
                json!({
                    "type": "Feature",
                    "properties": { "PRCL_ID": "001-02-3", "ADDR_NBR": "12", "NAME_ROOT": "main", "SUFFIX": "st" },
                    "geometry": point
                }),
                json!({
                    "type": "Feature",
                    "properties": { "PRCL_ID": "001-02-3", "ADDR_NBR": "12", "NAME_ROOT": "MAIN", "SUFFIX": "ST" },
                    "geometry": point
                }),
                json!({
                    "type": "Feature",
                    "properties": { "PRCL_ID": "001-02-3", "ADDR_NBR": "14" },
                    "geometry": point
                }),
            ],
        );

        let mut config = LoaderConfig::default();
        config.layers.parcels = parcels;
        config.layers.addresses = addresses;
        config.output.directory = output.path().to_path_buf();

        let prepared = prepare_datasets(&config).await.unwrap();

        assert!(prepared.parcels_fetched);
        assert!(prepared.addresses_fetched);
        assert_eq!(prepared.parcels.kept(), 1);
        assert_eq!(prepared.addresses.kept(), 1);
        assert_eq!(prepared.addresses.dropped_incomplete, 1);
        assert_eq!(prepared.addresses.dropped_duplicate, 1);
        assert_eq!(prepared.address_check.issues, 0);
        assert_eq!(prepared.parcel_check.issues, 0);

        for path in [
            config.output.raw_parcels_path(),
            config.output.raw_addresses_path(),
            config.output.cleaned_addresses_path(),
            config.output.standardized_parcels_path(),
        ] {
            assert!(path.exists(), "missing {}", path.display());
        }

        let standardized = FeatureCollection::read_from(&config.output.standardized_parcels_path()).unwrap();
        assert_eq!(standardized.features[0].properties["PRCL_ID"], json!("001023"));
    }

    #[tokio::test]
    async fn test_prepare_datasets_missing_layer_yields_empty_collections() {
        let output = TempDir::new().unwrap();
        let mut config = LoaderConfig::default();
        config.layers.parcels = output.path().join("absent-parcels.json").to_string_lossy().into_owned();
        config.layers.addresses = output.path().join("absent-addresses.json").to_string_lossy().into_owned();
        config.source.max_attempts = 1;
        config.output.directory = output.path().join("out");

        let prepared = prepare_datasets(&config).await.unwrap();

        assert!(!prepared.parcels_fetched);
        assert!(!prepared.addresses_fetched);
        assert_eq!(prepared.parcels.kept(), 0);
        let raw = FeatureCollection::read_from(&config.output.raw_parcels_path()).unwrap();
        assert!(raw.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_database_still_writes_interchange_files() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();

        let mut config = LoaderConfig::default();
        config.layers.parcels = write_layer(
            input.path(),
            "parcels.json",
            vec![json!({
                "type": "Feature",
                "properties": { "PRCL_ID": "7" },
                "geometry": { "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]] }
            })],
        );
        config.layers.addresses = write_layer(input.path(), "addresses.json", vec![]);
        config.output.directory = output.path().join("out");
        config.database.host = "127.0.0.1".to_string();
        config.database.port = 1;
        config.database.connect_timeout_secs = 1;

        let result = run(&config).await;

        assert!(matches!(result, Err(parcel_common::Error::Database(_))));
        for path in [
            config.output.raw_parcels_path(),
            config.output.raw_addresses_path(),
            config.output.cleaned_addresses_path(),
            config.output.standardized_parcels_path(),
        ] {
            assert!(path.exists(), "missing {}", path.display());
        }
    }
}
