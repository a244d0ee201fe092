//! Process runner
//!
//! The only place the harness talks to the operating system about child
//! processes. Tools are spawned directly (no shell) with positional path
//! arguments, and their three observables are captured in full.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::process::Command;

use crate::common::{Error, Result};

/// Exit code, stdout and stderr of one finished tool invocation
///
/// Text fields are already decoded and trimmed; comparisons against them
/// are exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

/// Runs an executable and captures its observables
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn run(&self, program: &Path, args: &[&Path]) -> Result<ExecutionResult>;
}

/// Launcher backed by real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn run(&self, program: &Path, args: &[&Path]) -> Result<ExecutionResult> {
        tracing::debug!(program = %program.display(), ?args, "Spawning tool");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| Error::Spawn {
                program: program.to_path_buf(),
                source,
            })?;

        let result = ExecutionResult {
            exit_code: exit_code(output.status),
            stdout: decode_lossy(&output.stdout),
            stderr: decode_lossy(&output.stderr),
        };
        tracing::debug!(
            program = %program.display(),
            exit_code = result.exit_code,
            "Tool exited"
        );
        Ok(result)
    }
}

/// Decode tool output as 7-bit text
///
/// Every non-ASCII byte becomes U+FFFD, so garbled or binary output can
/// never abort a run. Surrounding whitespace is trimmed.
pub fn decode_lossy(bytes: &[u8]) -> String {
    let text: String = bytes
        .iter()
        .map(|&b| {
            if b.is_ascii() {
                b as char
            } else {
                char::REPLACEMENT_CHARACTER
            }
        })
        .collect();
    text.trim().to_string()
}

/// Signal-terminated processes report `-signal`
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}

/// Resolve a tool path to an executable file
///
/// Tool arguments are paths, so a bare name refers to the working
/// directory and never to `PATH`. A missing or non-executable tool is a
/// harness error, not a test failure.
pub fn resolve_executable(program: &Path) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    resolve_executable_in(program, &cwd)
}

fn resolve_executable_in(program: &Path, cwd: &Path) -> Result<PathBuf> {
    let name = program.display().to_string();
    which::which(cwd.join(program)).map_err(|e| Error::executable_not_found(&name, e))
}
