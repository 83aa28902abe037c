//! Reading and writing `memscan.toml`
//!
//! Every field has a serde default, so a file only needs the keys it
//! changes and missing sections fall back to [`default_config`].

use super::defaults::default_config;
use crate::core::types::DataType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default configuration file name
pub const CONFIG_FILE: &str = "memscan.toml";

/// Errors raised while reading, writing or checking `memscan.toml`
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config file: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("cannot encode config: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("no config file at {0}")]
    FileNotFound(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Contents of `memscan.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_scanner")]
    pub scanner: ScannerConfig,

    #[serde(default = "default_connection")]
    pub connection: ConnectionConfig,

    #[serde(default = "default_logging")]
    pub logging: LoggingConfig,
}

/// Scanner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_float_epsilon")]
    pub float_epsilon: f64,
    #[serde(default = "default_alignment")]
    pub default_alignment: u32,
    /// Order in which any-type scans try integer widths
    #[serde(default = "default_int_ordering")]
    pub int_ordering: Vec<DataType>,
    /// Region protections skipped by region-aware scans
    #[serde(default = "default_skip_protections")]
    pub skip_protections: Vec<u32>,
    #[serde(default = "default_min_region_size")]
    pub min_region_size: u32,
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_little_endian")]
    pub little_endian: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log file; logs go to stderr when unset
    #[serde(default)]
    pub file: Option<String>,
}

/// Reads and writes one config file path
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        ConfigLoader {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Parses the file at this loader's path
    pub fn load(&self) -> Result<Config, ConfigError> {
        let contents = match fs::read_to_string(&self.config_path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::FileNotFound(self.config_path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(toml::from_str(&contents)?)
    }

    /// Loads configuration, falling back to defaults only when the file is
    /// missing. A file that exists but does not parse is still an error.
    pub fn load_or_default(&self) -> Result<Config, ConfigError> {
        match self.load() {
            Err(ConfigError::FileNotFound(_)) => Ok(Config::default()),
            other => other,
        }
    }

    /// Writes `config` back as pretty TOML, replacing the file
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        fs::write(&self.config_path, toml::to_string_pretty(config)?)?;
        Ok(())
    }
}

/// Reads `memscan.toml` from the working directory, or the defaults
pub fn load_config() -> Result<Config, ConfigError> {
    ConfigLoader::new(CONFIG_FILE).load_or_default()
}

// Default functions for serde
fn default_scanner() -> ScannerConfig {
    let defaults = default_config();
    ScannerConfig {
        chunk_size: defaults.scanner.chunk_size,
        float_epsilon: defaults.scanner.float_epsilon,
        default_alignment: defaults.scanner.default_alignment,
        int_ordering: defaults.scanner.int_ordering,
        skip_protections: defaults.scanner.skip_protections,
        min_region_size: defaults.scanner.min_region_size,
    }
}

fn default_connection() -> ConnectionConfig {
    let defaults = default_config();
    ConnectionConfig {
        read_timeout_ms: defaults.connection.read_timeout_ms,
        little_endian: defaults.connection.little_endian,
    }
}

fn default_logging() -> LoggingConfig {
    let defaults = default_config();
    LoggingConfig {
        level: defaults.logging.level,
        file: defaults.logging.file,
    }
}

// Individual field defaults
fn default_chunk_size() -> usize {
    default_config().scanner.chunk_size
}

fn default_float_epsilon() -> f64 {
    default_config().scanner.float_epsilon
}

fn default_alignment() -> u32 {
    default_config().scanner.default_alignment
}

fn default_int_ordering() -> Vec<DataType> {
    default_config().scanner.int_ordering
}

fn default_skip_protections() -> Vec<u32> {
    default_config().scanner.skip_protections
}

fn default_min_region_size() -> u32 {
    default_config().scanner.min_region_size
}

fn default_read_timeout_ms() -> u64 {
    default_config().connection.read_timeout_ms
}

fn default_little_endian() -> bool {
    default_config().connection.little_endian
}

fn default_log_level() -> String {
    default_config().logging.level
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scanner: default_scanner(),
            connection: default_connection(),
            logging: default_logging(),
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        default_scanner()
    }
}
