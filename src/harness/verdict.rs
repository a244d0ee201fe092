//! Verdict evaluation
//!
//! Expected observables are built from the category policy, compared against
//! what a tool actually did, and folded into a single pass/fail verdict.
//! Checks run in a fixed order (exit code, stdout, stderr, then output
//! artifacts) and stop at the first mismatch.

use std::fmt;
use std::path::Path;

use colored::Colorize;

use super::process::{ExecutionResult, Launcher};
use crate::common::{HarnessConfig, Result};

/// Expectation for one text stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expect {
    /// Trimmed text must be exactly this
    Exact(String),
    /// Any text, as long as there is some
    NonEmpty,
    /// Not checked
    Any,
}

impl Expect {
    pub fn empty() -> Self {
        Expect::Exact(String::new())
    }

    pub fn matches(&self, actual: &str) -> bool {
        match self {
            Expect::Exact(expected) => expected == actual,
            Expect::NonEmpty => !actual.is_empty(),
            Expect::Any => true,
        }
    }
}

/// What a correct tool would have produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedOutcome {
    pub exit_code: i32,
    pub stdout: Expect,
    pub stderr: Expect,
}

impl ExpectedOutcome {
    /// Comparer on identical images
    pub fn same_images(config: &HarnessConfig) -> Self {
        Self {
            exit_code: 0,
            stdout: Expect::Exact(config.same_message.clone()),
            stderr: Expect::empty(),
        }
    }

    /// Comparer on images that are not the same
    ///
    /// With an expected diagnostic the images differ in content and stderr
    /// must match it, even when the diagnostic is empty. Without one they are
    /// totally different and stderr only has to be present.
    pub fn different_images(config: &HarnessConfig, expected_stderr: Option<String>) -> Self {
        match expected_stderr {
            Some(text) => Self {
                exit_code: config.differ_code,
                stdout: Expect::Any,
                stderr: Expect::Exact(text),
            },
            None => Self {
                exit_code: config.totally_different_code,
                stdout: Expect::Any,
                stderr: Expect::NonEmpty,
            },
        }
    }

    /// Converter on valid input
    pub fn conversion_succeeded() -> Self {
        Self {
            exit_code: 0,
            stdout: Expect::empty(),
            stderr: Expect::empty(),
        }
    }

    /// Converter on invalid input
    pub fn conversion_failed(config: &HarnessConfig) -> Self {
        Self {
            exit_code: config.convert_failure_code,
            stdout: Expect::empty(),
            stderr: Expect::NonEmpty,
        }
    }

    /// First observable that does not match, if any
    pub fn check(&self, actual: &ExecutionResult) -> Option<Mismatch> {
        if self.exit_code != actual.exit_code {
            return Some(Mismatch::ReturnCode {
                expected: self.exit_code,
                actual: actual.exit_code,
            });
        }
        if !self.stdout.matches(&actual.stdout) {
            return Some(Mismatch::Stdout);
        }
        if !self.stderr.matches(&actual.stderr) {
            return Some(Mismatch::Stderr);
        }
        None
    }
}

/// Which observable was wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mismatch {
    ReturnCode { expected: i32, actual: i32 },
    Stdout,
    Stderr,
    /// A successful run left no output file
    ArtifactMissing,
    /// A failed run left an output file behind
    ArtifactPresent,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::ReturnCode { expected, actual } => {
                write!(f, "Return code {expected} != {actual}")
            }
            Mismatch::Stdout => f.write_str("incorrect stdout"),
            Mismatch::Stderr => f.write_str("incorrect stderr"),
            Mismatch::ArtifactMissing => f.write_str("output file was not created"),
            Mismatch::ArtifactPresent => {
                f.write_str("output file created in incorrect scenario")
            }
        }
    }
}

/// Which invocation of a case produced the mismatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The tool under test
    Run,
    /// The second conversion of a round trip
    SecondRun,
    /// The comparer checking the produced image
    Comparison,
}

/// Why a case failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Failure {
    pub stage: Stage,
    pub mismatch: Mismatch,
}

impl Failure {
    pub fn run(mismatch: Mismatch) -> Self {
        Self {
            stage: Stage::Run,
            mismatch,
        }
    }

    pub fn second_run(mismatch: Mismatch) -> Self {
        Self {
            stage: Stage::SecondRun,
            mismatch,
        }
    }

    pub fn comparison(mismatch: Mismatch) -> Self {
        Self {
            stage: Stage::Comparison,
            mismatch,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage {
            Stage::Run => write!(f, "{}", self.mismatch),
            Stage::SecondRun => write!(f, "second conversion: {}", self.mismatch),
            Stage::Comparison => write!(f, "result image is incorrect ({})", self.mismatch),
        }
    }
}

/// Result of a single case
///
/// Only a failure carries a reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail(Failure),
}

impl From<Option<Failure>> for Outcome {
    fn from(failure: Option<Failure>) -> Self {
        failure.map_or(Outcome::Pass, Outcome::Fail)
    }
}

/// Tags used in user-facing lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Ok,
    Failed,
    Passed,
}

impl Tag {
    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Ok => "OK",
            Tag::Failed => "FAILED",
            Tag::Passed => "PASSED",
        }
    }

    /// Tag text coloured for the terminal
    pub fn colored(self) -> colored::ColoredString {
        match self {
            Tag::Ok | Tag::Passed => self.as_str().green().bold(),
            Tag::Failed => self.as_str().red().bold(),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict for one named case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub name: String,
    pub outcome: Outcome,
}

impl Verdict {
    pub fn new(name: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            name: name.into(),
            outcome,
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Pass
    }

    fn tag(&self) -> Tag {
        match self.outcome {
            Outcome::Pass => Tag::Ok,
            Outcome::Fail(_) => Tag::Failed,
        }
    }

    fn render(&self, tag: impl fmt::Display) -> String {
        match &self.outcome {
            Outcome::Pass => format!("{tag} {}", self.name),
            Outcome::Fail(failure) => format!("{tag} {}: {failure}", self.name),
        }
    }

    /// Print the verdict line to stdout
    pub fn print(&self) {
        println!("{}", self.render(self.tag().colored()));
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(self.tag()))
    }
}

/// Ask the comparer whether two images are the same
///
/// The comparer's answer is held to the same-images policy; the first
/// mismatch is returned as a comparison failure.
pub async fn verify_same_images(
    launcher: &dyn Launcher,
    comparer: &Path,
    produced: &Path,
    reference: &Path,
    config: &HarnessConfig,
) -> Result<Option<Failure>> {
    let result = launcher.run(comparer, &[produced, reference]).await?;
    Ok(ExpectedOutcome::same_images(config)
        .check(&result)
        .map(Failure::comparison))
}
