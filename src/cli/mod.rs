//! CLI command handling
//!
//! Resolves the tools and data directory named on the command line and
//! hands them to the harness driver.

use std::path::Path;

use crate::commands::Commands;
use crate::common::{Error, HarnessConfig, Result};
use crate::harness::process::resolve_executable;
use crate::harness::{run_suite, ProcessLauncher, Summary, Toolchain};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config: &HarnessConfig) -> Result<Summary> {
    let (tools, test_data_dir) = match command {
        Commands::Comparer {
            comparer,
            test_data_dir,
        } => (
            Toolchain::Comparer {
                comparer: resolve_executable(&comparer)?,
            },
            test_data_dir,
        ),
        Commands::Converter {
            converter,
            test_data_dir,
            comparer,
        } => (
            Toolchain::Converter {
                converter: resolve_executable(&converter)?,
                comparer: resolve_executable(&comparer)?,
            },
            test_data_dir,
        ),
    };

    let test_data_dir = resolve_data_dir(&test_data_dir)?;
    run_suite(&ProcessLauncher, &tools, &test_data_dir, config).await
}

/// The data directory itself must exist; only its categories may be absent
fn resolve_data_dir(path: &Path) -> Result<std::path::PathBuf> {
    let resolved = path
        .canonicalize()
        .map_err(|e| Error::fixture_read(path, e))?;
    if !resolved.is_dir() {
        return Err(Error::fixture_read(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
        ));
    }
    Ok(resolved)
}
