use super::changelog::ChangelogConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "clkpr.toml";

/// main configuration for the changelog keeper
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeeperConfig {
    /// changelog-related configuration
    #[serde(default)]
    pub changelog: ChangelogConfig,

    /// tracing filter directive used when `RUST_LOG` is not set
    #[serde(default)]
    pub log_filter: Option<String>,
}

impl KeeperConfig {
    /// load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| Error::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: KeeperConfig = toml::from_str(&contents).map_err(|e| Error::TomlParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// find and load configuration file in a directory
    ///
    /// returns default config if the file is not found, a file that exists but
    /// cannot be parsed is an error
    pub fn load_or_default<P: AsRef<Path>>(dir: P) -> Result<Self> {
        match Self::find_config_file(&dir) {
            Some(config_path) => Self::load_from_file(&config_path),
            None => Ok(Self::default()),
        }
    }

    /// looks for `clkpr.toml` in the given directory
    pub fn find_config_file<P: AsRef<Path>>(dir: P) -> Option<PathBuf> {
        let config_path = dir.as_ref().join(CONFIG_FILE_NAME);

        if config_path.is_file() {
            Some(config_path)
        } else {
            None
        }
    }
}
