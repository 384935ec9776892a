//! Configuration loading and override resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables (`PARCEL_*`)
//! 3. TOML config file
//! 4. Compiled defaults (fallback)
//!
//! A missing TOML file is not an error: a warning is logged and the compiled
//! defaults are used. A TOML file that exists but does not parse is an error.
//!
//! The resolved [`LoaderConfig`] is passed explicitly to every component that
//! needs it; nothing reads configuration from global state after resolution.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const ENV_DB_HOST: &str = "PARCEL_DB_HOST";
pub const ENV_DB_PORT: &str = "PARCEL_DB_PORT";
pub const ENV_DB_NAME: &str = "PARCEL_DB_NAME";
pub const ENV_DB_USER: &str = "PARCEL_DB_USER";
pub const ENV_DB_PASSWORD: &str = "PARCEL_DB_PASSWORD";
pub const ENV_OUTPUT_DIR: &str = "PARCEL_OUTPUT_DIR";

const DEFAULT_PARCEL_LAYER: &str =
    "https://see-eldorado.edcgov.us/arcgis/rest/services/Symbium/SymbiumServices/MapServer/1";
const DEFAULT_ADDRESS_LAYER: &str =
    "https://see-eldorado.edcgov.us/arcgis/rest/services/Symbium/SymbiumServices/MapServer/0";

/// Complete loader configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoaderConfig {
    pub database: DatabaseConfig,
    pub layers: LayerConfig,
    pub source: SourceConfig,
    pub spatial: SpatialConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Destination database connection settings
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    /// Target database; created on first run if missing
    pub name: String,
    pub user: String,
    pub password: String,
    /// Database used to check for and create the target database
    pub maintenance_database: String,
    /// How long to keep retrying the initial connection
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            name: "el_dorado_county".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            maintenance_database: "postgres".to_string(),
            connect_timeout_secs: 30,
        }
    }
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

// Credentials stay out of log output
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("maintenance_database", &self.maintenance_database)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

/// Layer references for the feature source
///
/// Each value is either an ArcGIS MapServer layer URL or a path to a local
/// GeoJSON FeatureCollection file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayerConfig {
    pub parcels: String,
    pub addresses: String,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            parcels: DEFAULT_PARCEL_LAYER.to_string(),
            addresses: DEFAULT_ADDRESS_LAYER.to_string(),
        }
    }
}

/// Feature source retry and paging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
    pub timeout_secs: u64,
    pub page_size: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_secs: 5,
            timeout_secs: 1500,
            page_size: 1000,
        }
    }
}

impl SourceConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Coordinate reference system and spatial tolerances
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpatialConfig {
    pub srid: i32,
    /// Distance (CRS units) an address point may lie outside its parcel
    pub address_buffer: f64,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            srid: 4326,
            address_buffer: 0.5,
        }
    }
}

/// Interchange file locations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub raw_parcels: String,
    pub raw_addresses: String,
    pub cleaned_addresses: String,
    pub standardized_parcels: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            raw_parcels: "apns.geojson".to_string(),
            raw_addresses: "addresses.geojson".to_string(),
            cleaned_addresses: "cleaned_addresses.geojson".to_string(),
            standardized_parcels: "standardized_apns.geojson".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn raw_parcels_path(&self) -> PathBuf {
        self.directory.join(&self.raw_parcels)
    }

    pub fn raw_addresses_path(&self) -> PathBuf {
        self.directory.join(&self.raw_addresses)
    }

    pub fn cleaned_addresses_path(&self) -> PathBuf {
        self.directory.join(&self.cleaned_addresses)
    }

    pub fn standardized_parcels_path(&self) -> PathBuf {
        self.directory.join(&self.standardized_parcels)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Command-line overrides (highest priority)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub db_host: Option<String>,
    pub db_port: Option<u16>,
    pub db_name: Option<String>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub parcel_layer: Option<String>,
    pub address_layer: Option<String>,
    pub log_level: Option<String>,
}

impl LoaderConfig {
    /// Parse configuration from TOML text; absent keys take compiled defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load configuration from a TOML file
    ///
    /// Falls back to compiled defaults (with a warning) when the file is missing.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file not found: {}, using compiled defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply environment overrides using the given lookup
    ///
    /// The lookup is injected so callers (and tests) decide where values come from.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_DB_HOST) {
            self.database.host = host;
        }
        if let Some(port) = lookup(ENV_DB_PORT) {
            self.database.port = port
                .parse()
                .map_err(|e| Error::Config(format!("{} is not a valid port: {}", ENV_DB_PORT, e)))?;
        }
        if let Some(name) = lookup(ENV_DB_NAME) {
            self.database.name = name;
        }
        if let Some(user) = lookup(ENV_DB_USER) {
            self.database.user = user;
        }
        if let Some(password) = lookup(ENV_DB_PASSWORD) {
            self.database.password = password;
        }
        if let Some(dir) = lookup(ENV_OUTPUT_DIR) {
            self.output.directory = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Apply command-line overrides
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(host) = &overrides.db_host {
            self.database.host = host.clone();
        }
        if let Some(port) = overrides.db_port {
            self.database.port = port;
        }
        if let Some(name) = &overrides.db_name {
            self.database.name = name.clone();
        }
        if let Some(user) = &overrides.db_user {
            self.database.user = user.clone();
        }
        if let Some(password) = &overrides.db_password {
            self.database.password = password.clone();
        }
        if let Some(dir) = &overrides.output_dir {
            self.output.directory = dir.clone();
        }
        if let Some(layer) = &overrides.parcel_layer {
            self.layers.parcels = layer.clone();
        }
        if let Some(layer) = &overrides.address_layer {
            self.layers.addresses = layer.clone();
        }
        if let Some(level) = &overrides.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Reject settings that would make later stages misbehave
    pub fn validate(&self) -> Result<()> {
        validate_database_name(&self.database.name)?;
        if self.source.max_attempts == 0 {
            return Err(Error::Config("source.max_attempts must be at least 1".to_string()));
        }
        if self.source.page_size == 0 {
            return Err(Error::Config("source.page_size must be at least 1".to_string()));
        }
        if self.spatial.srid <= 0 {
            return Err(Error::Config(format!("spatial.srid must be positive, got {}", self.spatial.srid)));
        }
        if !self.spatial.address_buffer.is_finite() || self.spatial.address_buffer < 0.0 {
            return Err(Error::Config(format!(
                "spatial.address_buffer must be a non-negative number, got {}",
                self.spatial.address_buffer
            )));
        }
        Ok(())
    }

    /// Resolve the full configuration: TOML file, then environment, then CLI
    pub fn resolve(config_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = match config_path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(path) => Self::load(&path)?,
            None => {
                warn!("Could not determine config directory, using compiled defaults");
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }
}

/// Default configuration file path for the platform
///
/// `~/.config/parcel-loader/config.toml` on Linux, the platform equivalent elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("parcel-loader").join("config.toml"))
}

/// Database names are interpolated into `CREATE DATABASE` as quoted identifiers,
/// so they are restricted to a conservative character set up front.
pub fn validate_database_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 63
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(Error::Config(format!("Invalid database name: {:?}", name)))
    }
}
