//! Harness driver
//!
//! Runs all categories of a suite concurrently and folds their reports into
//! one summary. Categories touch disjoint fixture trees, so they share
//! nothing but the launcher and the configuration.

use std::fmt;
use std::path::Path;

use futures_util::future::try_join_all;

use super::category::{CaseRunner, CategoryReport, ComparerRunner, ConverterRunner, Toolchain};
use super::fixture::{CaseKind, ComparerCategory, ConverterCategory};
use super::process::Launcher;
use super::verdict::Tag;
use crate::common::{HarnessConfig, Result};

/// Aggregate of every category report of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub reports: Vec<CategoryReport>,
}

impl Summary {
    pub fn failed(&self) -> usize {
        self.reports.iter().map(|r| r.failed).sum()
    }

    pub fn passed(&self) -> usize {
        self.reports.iter().map(|r| r.passed).sum()
    }

    /// Process exit status for this summary
    pub fn exit_code(&self) -> i32 {
        if self.failed() > 0 {
            1
        } else {
            0
        }
    }

    fn render(&self, tag: fn(Tag) -> String) -> String {
        match self.failed() {
            0 => format!("All tests {}", tag(Tag::Passed)),
            n => format!("{n} tests {}", tag(Tag::Failed)),
        }
    }

    /// Print the final summary line to stdout
    pub fn print(&self) {
        println!("{}", self.render(|tag| tag.colored().to_string()));
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(|tag| tag.to_string()))
    }
}

/// Run every category of the toolchain's suite found under `test_data_dir`
///
/// Cases within a category run in order; categories run concurrently, so
/// their verdict lines may interleave. The failure count does not depend on
/// that interleaving. The first harness error aborts the whole run.
pub async fn run_suite(
    launcher: &dyn Launcher,
    tools: &Toolchain,
    test_data_dir: &Path,
    config: &HarnessConfig,
) -> Result<Summary> {
    tracing::debug!(?tools, data_dir = %test_data_dir.display(), "Starting suite");
    let reports = match tools {
        Toolchain::Comparer { comparer } => {
            let runner = ComparerRunner::new(launcher, comparer, config);
            run_categories(&runner, &ComparerCategory::ALL, test_data_dir).await?
        }
        Toolchain::Converter {
            converter,
            comparer,
        } => {
            let runner = ConverterRunner::new(launcher, converter, comparer, config);
            run_categories(&runner, &ConverterCategory::ALL, test_data_dir).await?
        }
    };

    let summary = Summary { reports };
    tracing::info!(
        passed = summary.passed(),
        failed = summary.failed(),
        "Suite finished"
    );
    Ok(summary)
}

async fn run_categories<R: CaseRunner>(
    runner: &R,
    kinds: &[R::Kind],
    test_data_dir: &Path,
) -> Result<Vec<CategoryReport>> {
    let dirs: Vec<_> = kinds
        .iter()
        .map(|&kind| (kind, test_data_dir.join(kind.category().dir_name())))
        .collect();
    try_join_all(dirs.iter().map(|(kind, dir)| runner.run(*kind, dir))).await
}
