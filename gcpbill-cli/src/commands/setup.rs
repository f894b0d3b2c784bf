//! `gcpbill-setup`: export setup and teardown.

use std::io::{IsTerminal, Write};
use std::time::Duration;

use anyhow::Result;
use gcpbill_core::WarehouseApi;
use gcpbill_fetch::ProcessRunner;
use gcpbill_report::{
    DatasetRemoval, DestroyRequest, ReportError, SetupConsole, SetupRequest, Verification,
    destroy_export, setup_export,
};
use gcpbill_store::SettingsStore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::ExitCode;
use crate::context::print_auth_help;

// ============================================================================
// Terminal Console
// ============================================================================

/// Console backed by stdout, stdin and the system browser.
pub struct TerminalConsole {
    runner: ProcessRunner,
    interactive: bool,
}

impl TerminalConsole {
    /// Creates a console; confirmation prompts are only shown when stdin is
    /// a terminal.
    pub fn new() -> Self {
        Self {
            runner: ProcessRunner::new(),
            interactive: std::io::stdin().is_terminal(),
        }
    }
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl SetupConsole for TerminalConsole {
    fn say(&self, line: &str) {
        println!("{line}");
    }

    async fn open_url(&self, url: &str) -> bool {
        self.runner.open_url(url).await
    }

    async fn wait_for_confirmation(&self, prompt: &str) -> bool {
        if !self.interactive {
            return false;
        }

        print!("{prompt}");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        match BufReader::new(tokio::io::stdin()).read_line(&mut line).await {
            Ok(0) => false,
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "Failed to read confirmation");
                false
            }
        }
    }

    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// ============================================================================
// Commands
// ============================================================================

fn failure_code(error: &ReportError) -> ExitCode {
    if error.is_authentication() {
        eprintln!();
        print_auth_help(&error.to_string());
    } else {
        eprintln!();
        eprintln!("Error: {error}");
    }
    ExitCode::Error
}

/// Creates the dataset, guides the console step and remembers the export
/// location and billing account in settings.
pub async fn run_setup<W, C>(
    warehouse: &W,
    console: &C,
    store: &SettingsStore,
    request: &SetupRequest,
) -> Result<ExitCode>
where
    W: WarehouseApi,
    C: SetupConsole,
{
    let outcome = match setup_export(warehouse, console, request).await {
        Ok(outcome) => outcome,
        Err(e) => return Ok(failure_code(&e)),
    };

    if let Verification::Failed(reason) = &outcome.verification {
        debug!(reason, "Export verification failed");
    }

    store
        .remember_export(&request.project_id, &request.dataset_id)
        .await;
    store
        .set_default_billing_account(request.account.as_str())
        .await;
    if let Err(e) = store.save().await {
        warn!(error = %e, path = %store.path().display(), "Failed to save settings");
    }

    Ok(ExitCode::Success)
}

/// Prints the steps to disable export and optionally deletes the dataset.
pub async fn run_destroy<W, C>(
    warehouse: &W,
    console: &C,
    request: &DestroyRequest,
) -> Result<ExitCode>
where
    W: WarehouseApi,
    C: SetupConsole,
{
    match destroy_export(warehouse, console, request).await {
        Ok(DatasetRemoval::Failed(reason)) => {
            debug!(reason, "Dataset deletion failed");
            Ok(ExitCode::Success)
        }
        Ok(_) => Ok(ExitCode::Success),
        Err(e) => Ok(failure_code(&e)),
    }
}
