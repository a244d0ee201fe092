//! CLI command definitions
//!
//! Defines the clap commands for the conformance harness.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Check an image comparer against the `same/` and `diff/` fixtures
    Comparer {
        /// Path to the comparer executable
        comparer: PathBuf,

        /// Directory holding the fixture categories
        test_data_dir: PathBuf,
    },

    /// Check an image converter against the `ok/`, `not_ok/` and `twice/` fixtures
    Converter {
        /// Path to the converter executable
        converter: PathBuf,

        /// Directory holding the fixture categories
        test_data_dir: PathBuf,

        /// Comparer used to check the converted images
        comparer: PathBuf,
    },
}
