//! Configuration paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/bmp-conformance/`
//! - macOS: `~/Library/Application Support/bmp-conformance/`
//! - Windows: `%APPDATA%\bmp-conformance\`

use std::path::PathBuf;

/// Name of the per-user configuration directory
const APP_NAME: &str = "bmp-conformance";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
