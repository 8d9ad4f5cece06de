//! Configuration loading and database path resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the configured database path
pub const DATABASE_ENV_VAR: &str = "TML_DATABASE";

/// Bootstrap configuration read from `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub database_path: Option<PathBuf>,
    pub merge: MergeConfig,
    pub logging: LoggingConfig,
}

/// Batch merge tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Maximum age in seconds of a row that new activity may fold into
    pub window_secs: u64,
    /// Categories whose rows may become batches
    pub eligible_categories: Vec<u8>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            window_secs: 15 * 60,
            eligible_categories: vec![3],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }
}

/// Where a loaded config came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// No file at the default location
    Defaults,
}

/// Load the TOML config
///
/// An explicit path must exist and parse. Without one, the platform
/// default location is tried and a missing file yields defaults. Runs
/// before logging is set up, so the caller reports the source.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<(TomlConfig, ConfigSource)> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok((TomlConfig::default(), ConfigSource::Defaults)),
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
    let config = TomlConfig::from_toml_str(&content)?;
    Ok((config, ConfigSource::File(path)))
}

/// Platform config file location, e.g. `~/.config/tml/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tml").join("config.toml"))
}

/// Database path resolution, highest priority first:
/// 1. Command-line argument
/// 2. `TML_DATABASE` environment variable
/// 3. `database_path` in the TOML config
/// 4. OS data directory default
pub fn resolve_database_path(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(DATABASE_ENV_VAR) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.database_path {
        return path.clone();
    }

    default_database_path()
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::data_dir)
        .map(|d| d.join("tml").join("timeline.db"))
        .unwrap_or_else(|| PathBuf::from("./tml_data/timeline.db"))
}
