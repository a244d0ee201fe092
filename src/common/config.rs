//! Configuration file handling
//!
//! The defaults encode the external tool contract. A TOML file can override
//! them for tools that print a different sentinel or use other exit codes.

use serde::Deserialize;
use std::path::Path;

use super::paths::config_path;
use super::{Error, Result};

/// Expectations the harness holds the tools under test to
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Text the comparer prints when two images are identical
    #[serde(default = "default_same_message")]
    pub same_message: String,

    /// Comparer exit code for images that differ in content
    #[serde(default = "default_differ_code")]
    pub differ_code: i32,

    /// Comparer exit code for images with incompatible formats or dimensions
    #[serde(default = "default_totally_different_code")]
    pub totally_different_code: i32,

    /// Converter exit code for a rejected input
    #[serde(default = "default_convert_failure_code")]
    pub convert_failure_code: i32,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            same_message: default_same_message(),
            differ_code: default_differ_code(),
            totally_different_code: default_totally_different_code(),
            convert_failure_code: default_convert_failure_code(),
        }
    }
}

fn default_same_message() -> String {
    "Images are same".to_string()
}
fn default_differ_code() -> i32 {
    2
}
fn default_totally_different_code() -> i32 {
    1
}
fn default_convert_failure_code() -> i32 {
    1
}

impl HarnessConfig {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the per-user config file is
    /// used when present, and the built-in defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Parse a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        let config: Self =
            toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        tracing::debug!(path = %path.display(), ?config, "Loaded configuration");
        Ok(config)
    }
}
