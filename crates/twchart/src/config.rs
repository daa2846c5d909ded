//! Project configuration file support for twchart.
//!
//! Loads configuration from `twchart.toml` in the working directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use twchart_sessions::RowPolicy;

/// The config file name
pub const CONFIG_FILE_NAME: &str = "twchart.toml";

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Settings loaded from `twchart.toml`
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory holding stored session logs
    pub sessions_dir: Option<PathBuf>,
    /// Default tracing level, e.g. `debug`
    pub log_level: Option<String>,
    /// What to do with sensor rows that fail to parse
    #[serde(default)]
    pub row_errors: RowPolicy,
}

impl Config {
    /// Load configuration from `dir`.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    /// Effective log level. Priority: flag > config > default
    pub fn log_level<'a>(&'a self, flag: Option<&'a str>) -> &'a str {
        flag.or(self.log_level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Effective sessions directory. Priority: flag > config > store default
    pub fn sessions_dir(&self, flag: Option<PathBuf>) -> Option<PathBuf> {
        flag.or_else(|| self.sessions_dir.clone())
    }
}
