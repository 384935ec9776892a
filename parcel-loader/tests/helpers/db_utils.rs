//! Database Test Utilities
//!
//! Database tests need a PostGIS server named by PARCEL_TEST_DATABASE_URL.
//! They are marked `#[ignore]`; when run, a missing URL is an error.

use anyhow::Result;
use parcel_common::config::SpatialConfig;
use parcel_common::db::{connect_with, create_schema};
use parcel_loader::SpatialStore;
use sqlx::postgres::PgConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;

pub const TEST_DATABASE_ENV: &str = "PARCEL_TEST_DATABASE_URL";

/// Connect to the test database with an empty parcel schema
pub async fn test_pool() -> Result<PgPool> {
    let url = std::env::var(TEST_DATABASE_ENV)
        .map_err(|_| anyhow::anyhow!("{} must be set for database tests", TEST_DATABASE_ENV))?;

    let pool = connect_with(PgConnectOptions::from_str(&url)?).await?;
    let outcome = create_schema(&pool, SpatialConfig::default().srid).await;
    anyhow::ensure!(outcome.is_success(), "schema setup failed: {}", outcome);
    reset_tables(&pool).await?;
    Ok(pool)
}

/// Store over a freshly reset test database
pub async fn test_store() -> Result<SpatialStore> {
    Ok(SpatialStore::new(test_pool().await?, &SpatialConfig::default()))
}

/// Remove all rows from the parcel tables
pub async fn reset_tables(pool: &PgPool) -> Result<()> {
    sqlx::query("TRUNCATE parcel_address, parcel_apn, parcel RESTART IDENTITY CASCADE")
        .execute(pool)
        .await?;
    Ok(())
}
