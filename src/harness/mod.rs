//! Conformance harness
//!
//! Drives the comparer and converter under test as black boxes against the
//! on-disk fixture tree and turns what they do into pass/fail verdicts.

pub mod category;
pub mod driver;
pub mod fixture;
pub mod process;
pub mod verdict;

pub use category::{CaseRunner, CategoryReport, ComparerRunner, ConverterRunner, Toolchain};
pub use driver::{run_suite, Summary};
pub use fixture::{Category, ComparerCategory, ConverterCategory, TestCase};
pub use process::{ExecutionResult, Launcher, ProcessLauncher};
pub use verdict::{Outcome, Verdict};
