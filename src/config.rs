//! Runtime settings, layered from an optional TOML file and `F1_STATS_*`
//! environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ::config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "f1-stats.toml";
pub const ENV_PREFIX: &str = "F1_STATS";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Directory holding the `f1db-*.csv` / `.parquet` files.
    pub data_dir: PathBuf,
    pub http_timeout_secs: u64,
    /// Lower bound of the season range when none is given.
    pub default_year_from: i64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("database"),
            http_timeout_secs: 5,
            default_year_from: 2010,
        }
    }
}

impl DashboardConfig {
    /// Read `path` if it exists, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
