//! Updater configuration (config.yaml)
//!
//! ```yaml
//! backupRetention: 5
//! timestampFormat: "%Y%m%d_%H%M%S"
//! projects:
//!   - /srv/shop
//!   - /srv/blog
//! ```

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_DIR_NAME: &str = "redeploy";
pub const CONFIG_FILE_NAME: &str = "config.yaml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {details}")]
    InvalidConfiguration { details: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdaterConfig {
    /// Number of configuration snapshots kept per project
    #[serde(default = "default_backup_retention")]
    pub backup_retention: usize,

    /// chrono format used to name snapshot directories
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,

    /// Project directories, updated in order
    #[serde(default)]
    pub projects: Vec<PathBuf>,

    /// Grace period handed to the graceful stop command
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,

    /// Lines of container logs shown after a successful update
    #[serde(default = "default_log_tail_lines")]
    pub log_tail_lines: usize,
}

fn default_backup_retention() -> usize {
    5
}

fn default_timestamp_format() -> String {
    "%Y%m%d_%H%M%S".to_string()
}

fn default_stop_timeout_secs() -> u64 {
    10
}

fn default_log_tail_lines() -> usize {
    20
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            backup_retention: default_backup_retention(),
            timestamp_format: default_timestamp_format(),
            projects: Vec::new(),
            stop_timeout_secs: default_stop_timeout_secs(),
            log_tail_lines: default_log_tail_lines(),
        }
    }
}

impl UpdaterConfig {
    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, falling back to defaults when it is absent
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    /// `<config dir>/redeploy/config.yaml`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timestamp_format.trim().is_empty() {
            return Err(ConfigError::InvalidConfiguration {
                details: "timestampFormat cannot be empty".to_string(),
            });
        }

        if StrftimeItems::new(&self.timestamp_format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::InvalidConfiguration {
                details: format!(
                    "timestampFormat '{}' is not a valid chrono format",
                    self.timestamp_format
                ),
            });
        }

        // Rendered timestamps become directory names
        if self.timestamp_format.contains('/') {
            return Err(ConfigError::InvalidConfiguration {
                details: "timestampFormat cannot contain '/'".to_string(),
            });
        }

        Ok(())
    }

    pub fn with_projects(mut self, projects: Vec<PathBuf>) -> Self {
        self.projects = projects;
        self
    }

    pub fn with_backup_retention(mut self, retention: usize) -> Self {
        self.backup_retention = retention;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_keys() {
        let config = UpdaterConfig::from_yaml("projects:\n  - /srv/shop\n").unwrap();
        assert_eq!(config.backup_retention, 5);
        assert_eq!(config.timestamp_format, "%Y%m%d_%H%M%S");
        assert_eq!(config.stop_timeout_secs, 10);
        assert_eq!(config.projects, vec![PathBuf::from("/srv/shop")]);
    }

    #[test]
    fn test_rejects_bad_timestamp_format() {
        let err = UpdaterConfig::from_yaml("timestampFormat: \"%Y-%Q\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfiguration { .. }));

        let err = UpdaterConfig::from_yaml("timestampFormat: \"%Y/%m\"\n").unwrap_err();
        assert!(err.to_string().contains("'/'"));
    }
}
