//! Error types for the conformance harness
//!
//! These are harness/environment failures only. A tool under test that
//! misbehaves produces a failed `Verdict`, never an `Error`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the conformance harness
#[derive(Error, Debug)]
pub enum Error {
    // === Executable Errors ===
    #[error("Executable '{name}' not found: {reason}")]
    ExecutableNotFound { name: String, reason: String },

    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    // === Fixture Errors ===
    #[error("Failed to read fixture directory '{path}': {source}")]
    FixtureRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to remove output artifact '{path}': {source}")]
    ArtifactCleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // === Configuration Errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Create an executable not found error
    pub fn executable_not_found(name: &str, reason: impl ToString) -> Self {
        Self::ExecutableNotFound {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a fixture directory read error
    pub fn fixture_read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FixtureRead {
            path: path.into(),
            source,
        }
    }
}
