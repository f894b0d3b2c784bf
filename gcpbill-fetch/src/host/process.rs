//! Subprocess execution for the `gcloud` CLI and the browser opener.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::error::ProcessError;

/// Default command timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Process Output
// ============================================================================

/// Output from a process execution.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Standard output content.
    pub stdout: String,
    /// Standard error content.
    pub stderr: String,
    /// Exit code (0 = success).
    pub exit_code: i32,
    /// How long the command took to execute.
    pub duration: Duration,
}

impl ProcessOutput {
    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns trimmed stdout if successful, otherwise an error.
    pub fn stdout_if_success(&self) -> Result<&str, ProcessError> {
        if self.success() {
            Ok(self.stdout.trim())
        } else {
            Err(ProcessError::NonZeroExit {
                code: self.exit_code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

// ============================================================================
// Process Runner
// ============================================================================

/// Runs external commands.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a new process runner.
    pub fn new() -> Self {
        Self
    }

    /// Runs a command with the default timeout and captures output.
    #[instrument(skip(self), fields(cmd = %cmd))]
    pub async fn run(&self, cmd: &str, args: &[&str]) -> Result<ProcessOutput, ProcessError> {
        self.run_with_timeout(cmd, args, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .await
    }

    /// Runs a command with a timeout.
    #[instrument(skip(self), fields(cmd = %cmd, timeout = ?timeout))]
    pub async fn run_with_timeout(
        &self,
        cmd: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        debug!(args = ?args, "Running command");

        let cmd_path = self.which(cmd).ok_or_else(|| {
            debug!(cmd = %cmd, "Command not found");
            ProcessError::NotFound(cmd.to_string())
        })?;

        let start = Instant::now();

        let mut command = Command::new(&cmd_path);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, command.output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(cmd = %cmd, timeout = ?timeout, "Command timed out");
                return Err(ProcessError::Timeout(timeout));
            }
        };

        let duration = start.elapsed();
        let exit_code = output.status.code().unwrap_or(-1);

        let result = ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code,
            duration,
        };

        debug!(
            exit_code = exit_code,
            duration = ?duration,
            stdout_len = result.stdout.len(),
            "Command completed"
        );

        Ok(result)
    }

    /// Checks if a command exists on PATH.
    pub fn command_exists(&self, cmd: &str) -> bool {
        self.which(cmd).is_some()
    }

    /// Finds the path to a command.
    pub fn which(&self, cmd: &str) -> Option<PathBuf> {
        which::which(cmd).ok()
    }

    /// Opens a URL in the default browser.
    ///
    /// Returns false if no opener is available or it failed.
    #[instrument(skip(self))]
    pub async fn open_url(&self, url: &str) -> bool {
        let (cmd, args): (&str, Vec<&str>) = if cfg!(target_os = "macos") {
            (commands::OPEN, vec![url])
        } else if cfg!(target_os = "windows") {
            (commands::CMD, vec!["/C", "start", "", url])
        } else {
            (commands::XDG_OPEN, vec![url])
        };

        match self.run(cmd, &args).await {
            Ok(output) => output.success(),
            Err(e) => {
                debug!(error = %e, "Could not open browser");
                false
            }
        }
    }
}

// ============================================================================
// Common CLI Commands
// ============================================================================

/// Command names.
pub mod commands {
    /// Google Cloud SDK CLI.
    pub const GCLOUD: &str = "gcloud";
    /// macOS opener.
    pub const OPEN: &str = "open";
    /// Linux desktop opener.
    pub const XDG_OPEN: &str = "xdg-open";
    /// Windows shell.
    pub const CMD: &str = "cmd";
}

// ============================================================================
// Tests
// ============================================================================
