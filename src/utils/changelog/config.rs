// changelog configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// configuration for the changelog document itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangelogConfig {
    /// name of the changelog file (default: "CHANGELOG.md")
    pub file_name: String,

    /// name of the pending version placeholder (default: "Unreleased")
    pub unreleased_name: String,

    /// lines written above the first version by `create`
    pub header: Vec<String>,
}

impl ChangelogConfig {
    /// create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    pub fn unreleased_name(mut self, name: impl Into<String>) -> Self {
        self.unreleased_name = name.into();
        self
    }

    pub fn header<S: Into<String>>(mut self, header: impl IntoIterator<Item = S>) -> Self {
        self.header = header.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_path(&self) -> PathBuf {
        PathBuf::from(&self.file_name)
    }
}

impl Default for ChangelogConfig {
    fn default() -> Self {
        Self {
            file_name: "CHANGELOG.md".to_string(),
            unreleased_name: "Unreleased".to_string(),
            header: vec!["# Changelog".to_string(), String::new()],
        }
    }
}
