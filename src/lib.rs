//! BMP conformance harness
//!
//! This library drives external image comparer and converter executables
//! against a directory of fixtures and validates their exit codes and
//! output.

pub mod bmp;
pub mod cli;
pub mod commands;
pub mod common;
pub mod harness;

// Re-export commonly used types for tests
pub use common::{Error, HarnessConfig, Result};
pub use harness::{Category, Summary, Verdict};
