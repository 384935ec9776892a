//! Database provisioning tests
//!
//! These run against a live PostGIS server named by PARCEL_TEST_DATABASE_URL
//! and are ignored by default; run them with `cargo test -- --ignored`.

use parcel_common::db::{connect_with, create_schema};
use serial_test::serial;
use sqlx::postgres::PgConnectOptions;
use std::str::FromStr;

fn test_options() -> PgConnectOptions {
    let url = std::env::var("PARCEL_TEST_DATABASE_URL").expect("PARCEL_TEST_DATABASE_URL must be set");
    PgConnectOptions::from_str(&url).expect("PARCEL_TEST_DATABASE_URL is not a valid connection URL")
}

#[tokio::test]
#[serial]
#[ignore = "needs PostGIS via PARCEL_TEST_DATABASE_URL"]
async fn test_create_schema_is_idempotent() {
    let pool = connect_with(test_options()).await.unwrap();

    assert!(create_schema(&pool, 4326).await.is_success());
    assert!(create_schema(&pool, 4326).await.is_success());

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT table_name::text FROM information_schema.tables
         WHERE table_name IN ('parcel', 'parcel_apn', 'parcel_address')
         ORDER BY table_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert_eq!(tables, vec!["parcel", "parcel_address", "parcel_apn"]);
}
