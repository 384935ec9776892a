//! Configuration resolution tests
//!
//! Covers the priority order CLI > ENV > TOML > compiled defaults and the
//! graceful handling of missing config files.
//!
//! Note: Uses serial_test to prevent ENV variable race conditions. Tests that
//! manipulate PARCEL_* variables are marked with #[serial].

use parcel_common::config::{ConfigOverrides, LoaderConfig, ENV_DB_HOST, ENV_DB_NAME, ENV_OUTPUT_DIR};
use parcel_common::Error;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_env() {
    for key in [ENV_DB_HOST, ENV_DB_NAME, ENV_OUTPUT_DIR] {
        env::remove_var(key);
    }
}

#[test]
fn test_missing_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = LoaderConfig::load(&temp_dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, LoaderConfig::default());
}

#[test]
fn test_malformed_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[database\nname = ").unwrap();

    let result = LoaderConfig::load(&path);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_resolve_priority_order() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        [database]
        host = "toml-host"
        name = "toml_db"

        [output]
        directory = "/tmp/from-toml"
        "#,
    )
    .unwrap();

    env::set_var(ENV_DB_NAME, "env_db");
    env::set_var(ENV_OUTPUT_DIR, "/tmp/from-env");

    let overrides = ConfigOverrides {
        output_dir: Some(PathBuf::from("/tmp/from-cli")),
        ..Default::default()
    };
    let config = LoaderConfig::resolve(Some(&path), &overrides).unwrap();
    clear_env();

    // TOML beats defaults
    assert_eq!(config.database.host, "toml-host");
    // ENV beats TOML
    assert_eq!(config.database.name, "env_db");
    // CLI beats ENV
    assert_eq!(config.output.directory, PathBuf::from("/tmp/from-cli"));
}

#[test]
#[serial]
fn test_resolve_rejects_invalid_settings() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[source]\nmax_attempts = 0\n").unwrap();

    let result = LoaderConfig::resolve(Some(&path), &ConfigOverrides::default());
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_output_paths_join_directory() {
    let mut config = LoaderConfig::default();
    config.output.directory = PathBuf::from("/data/out");
    assert_eq!(
        config.output.cleaned_addresses_path(),
        PathBuf::from("/data/out/cleaned_addresses.geojson")
    );
    assert_eq!(
        config.output.standardized_parcels_path(),
        PathBuf::from("/data/out/standardized_apns.geojson")
    );
}
