//! Database initialization
//!
//! Provisioning and schema creation are best-effort: failures are logged and
//! returned as a [`StepOutcome`] so the run can continue. Later stages fail
//! loudly on their own if the schema is actually missing.

use crate::config::{validate_database_name, DatabaseConfig};
use crate::db::StepOutcome;
use crate::Result;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Connection, PgConnection, PgPool, Postgres, Transaction};
use std::time::Duration;
use tracing::info;

/// Connection options for `database` on the configured server
pub fn connect_options(config: &DatabaseConfig, database: &str) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(database)
}

/// Open the single exclusive connection used by a run
///
/// The pool is capped at one connection: every step runs sequentially on it
/// and no concurrent writers exist.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    connect_with_timeout(connect_options(config, &config.name), config.connect_timeout()).await
}

/// Open a single-connection pool from explicit options
pub async fn connect_with(options: PgConnectOptions) -> Result<PgPool> {
    connect_with_timeout(options, Duration::from_secs(30)).await
}

async fn connect_with_timeout(options: PgConnectOptions, timeout: Duration) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(timeout)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Create the target database if it does not exist yet
///
/// Existence is checked with a bound parameter against `pg_database`; the
/// create statement uses a validated, quoted identifier.
pub async fn ensure_database(config: &DatabaseConfig) -> StepOutcome {
    StepOutcome::from_result("ensure database", try_ensure_database(config).await)
}

async fn try_ensure_database(config: &DatabaseConfig) -> Result<bool> {
    validate_database_name(&config.name)?;

    let mut conn =
        PgConnection::connect_with(&connect_options(config, &config.maintenance_database)).await?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(&config.name)
            .fetch_one(&mut conn)
            .await?;

    if exists {
        info!("Database '{}' already exists", config.name);
    } else {
        let statement = format!("CREATE DATABASE {}", quote_identifier(&config.name));
        sqlx::raw_sql(&statement).execute(&mut conn).await?;
        info!("Database '{}' created successfully", config.name);
    }

    conn.close().await?;
    Ok(!exists)
}

/// Double-quote an identifier, escaping embedded quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Create the PostGIS extension and the parcel tables
///
/// Idempotent. A failure is reported through the returned outcome and the
/// transaction is rolled back when it drops.
pub async fn create_schema(pool: &PgPool, srid: i32) -> StepOutcome {
    StepOutcome::from_result("create schema", try_create_schema(pool, srid).await)
}

async fn try_create_schema(pool: &PgPool, srid: i32) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("CREATE EXTENSION IF NOT EXISTS postgis")
        .execute(&mut *tx)
        .await?;

    create_parcel_table(&mut tx, srid).await?;
    create_parcel_apn_table(&mut tx).await?;
    create_parcel_address_table(&mut tx, srid).await?;

    tx.commit().await?;
    info!(srid, "Parcel schema initialized (parcel, parcel_apn, parcel_address)");
    Ok(())
}

async fn create_parcel_table(tx: &mut Transaction<'_, Postgres>, srid: i32) -> Result<()> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS parcel (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            geom GEOMETRY(MultiPolygon, {srid}),
            apn VARCHAR(255) UNIQUE
        )
        "#
    ))
    .execute(&mut **tx)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS parcel_geom_idx ON parcel USING GIST (geom)")
        .execute(&mut **tx)
        .await?;

    Ok(())
}

async fn create_parcel_apn_table(tx: &mut Transaction<'_, Postgres>) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS parcel_apn (
            parcel_id UUID NOT NULL,
            apn VARCHAR(255) NOT NULL,
            CONSTRAINT fk_parcel
                FOREIGN KEY (parcel_id)
                REFERENCES parcel (id)
                ON DELETE CASCADE
        )
        "#,
    )
    .execute(&mut **tx)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS parcel_apn_apn_idx ON parcel_apn (apn)")
        .execute(&mut **tx)
        .await?;

    Ok(())
}

async fn create_parcel_address_table(tx: &mut Transaction<'_, Postgres>, srid: i32) -> Result<()> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS parcel_address (
            id SERIAL PRIMARY KEY,
            parcel_id UUID NOT NULL,
            address TEXT NOT NULL,
            geom GEOMETRY(Point, {srid}),
            CONSTRAINT fk_parcel_address
                FOREIGN KEY (parcel_id)
                REFERENCES parcel (id)
                ON DELETE CASCADE,
            CONSTRAINT uq_parcel_address
                UNIQUE (parcel_id, address)
        )
        "#
    ))
    .execute(&mut **tx)
    .await?;

    Ok(())
}
