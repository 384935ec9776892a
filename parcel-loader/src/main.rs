//! parcel-loader - county parcel and address ingest
//!
//! Downloads the parcel and address layers, cleans them, loads them into a
//! PostGIS database and verifies the result. One run, then exit.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use parcel_common::config::{ConfigOverrides, LoaderConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for parcel-loader
#[derive(Parser, Debug)]
#[command(name = "parcel-loader")]
#[command(about = "Load county parcels and addresses into PostGIS")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "PARCEL_CONFIG")]
    config: Option<PathBuf>,

    /// Database server host
    #[arg(long)]
    db_host: Option<String>,

    /// Database server port
    #[arg(long)]
    db_port: Option<u16>,

    /// Target database name (created if missing)
    #[arg(long)]
    db_name: Option<String>,

    #[arg(long)]
    db_user: Option<String>,

    #[arg(long)]
    db_password: Option<String>,

    /// Directory for the downloaded and cleaned GeoJSON files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Parcel layer URL or local GeoJSON path
    #[arg(long)]
    parcel_layer: Option<String>,

    /// Address layer URL or local GeoJSON path
    #[arg(long)]
    address_layer: Option<String>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            db_host: self.db_host.clone(),
            db_port: self.db_port,
            db_name: self.db_name.clone(),
            db_user: self.db_user.clone(),
            db_password: self.db_password.clone(),
            output_dir: self.output_dir.clone(),
            parcel_layer: self.parcel_layer.clone(),
            address_layer: self.address_layer.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins; otherwise start from --log-level and switch to the
    // configured level once the config file has been read
    let env_filter = EnvFilter::try_from_default_env().ok();
    let filter_from_env = env_filter.is_some();
    let startup_filter =
        env_filter.unwrap_or_else(|| EnvFilter::new(args.log_level.as_deref().unwrap_or("info")));
    let (filter, filter_handle) = reload::Layer::new(startup_filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = LoaderConfig::resolve(args.config.as_deref(), &args.overrides())
        .context("Failed to resolve configuration")?;
    if !filter_from_env {
        filter_handle
            .reload(EnvFilter::new(&config.logging.level))
            .context("Failed to apply configured log level")?;
    }

    info!("Starting parcel-loader {}", env!("CARGO_PKG_VERSION"));
    info!(
        host = %config.database.host,
        port = config.database.port,
        database = %config.database.name,
        "Target database"
    );
    info!("Output directory: {}", config.output.directory.display());

    let report = parcel_loader::workflow::run(&config).await.context("Run aborted")?;

    let load = &report.load;
    info!(
        inserted = load.parcels.inserted,
        repaired = load.repair.repaired,
        deleted = load.repair.deleted,
        identifiers = load.identifiers,
        addresses = load.addresses.inserted,
        "Load finished"
    );
    let failed = load.verification.failures().count();
    info!(
        checks = load.verification.checks.len(),
        failed,
        "Verification finished"
    );

    Ok(())
}
