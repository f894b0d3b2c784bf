//! Billing export setup and teardown.
//!
//! Google offers no API for linking a billing account to a dataset, so setup
//! prepares the dataset, prints the console steps, and checks afterwards
//! whether the export table appeared. Destroy prints the steps to disable the
//! export and optionally deletes the dataset.

use std::future::Future;
use std::time::Duration;

use gcpbill_core::{
    BillingAccountId, DatasetCreation, ErrorKind, ProviderError, TableRef, WarehouseApi,
};
use tracing::{debug, info, instrument, warn};

use crate::error::ReportError;
use crate::locator::{candidate_fragments, expected_table_name, match_export_table};
use crate::remedy::{
    costs_command, dataset_console_url, delete_dataset_command, enable_api_command,
    list_tables_command,
};

/// Wait between confirmation and the table check.
pub const VERIFY_DELAY: Duration = Duration::from_secs(10);

const RULE: &str = "======================================================================";

/// Terminal interaction used by the orchestrator.
pub trait SetupConsole: Send + Sync {
    /// Prints a line.
    fn say(&self, line: &str);

    /// Opens a URL in the browser. Returns false if that failed.
    fn open_url(&self, url: &str) -> impl Future<Output = bool> + Send;

    /// Waits for the user to confirm. Returns false when input is unavailable.
    fn wait_for_confirmation(&self, prompt: &str) -> impl Future<Output = bool> + Send;

    /// Sleeps.
    fn pause(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

// ============================================================================
// Setup
// ============================================================================

/// Setup parameters.
#[derive(Debug, Clone)]
pub struct SetupRequest {
    /// Billing account to export.
    pub account: BillingAccountId,
    /// Project holding the dataset.
    pub project_id: String,
    /// Dataset receiving the export.
    pub dataset_id: String,
    /// Dataset location.
    pub location: String,
}

/// Result of the post-configuration table check.
#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    /// The export table exists.
    Found(TableRef),
    /// The table has not appeared yet.
    NotYet,
    /// No interactive input; the check was skipped.
    Skipped,
    /// The check itself failed.
    Failed(String),
}

/// Result of a setup run.
#[derive(Debug, Clone)]
pub struct SetupOutcome {
    /// Whether the dataset was created or already existed.
    pub dataset: DatasetCreation,
    /// Tables found in the dataset before configuration.
    pub existing_tables: Vec<String>,
    /// Table check result.
    pub verification: Verification,
}

fn step_failure(
    console: &impl SetupConsole,
    step: &'static str,
    source: ProviderError,
    hints: &[String],
) -> ReportError {
    console.say(&format!("  ✗ {source}"));
    for hint in hints {
        console.say(hint);
    }
    ReportError::Step { step, source }
}

/// Prepares the dataset and walks the user through linking it.
#[instrument(skip(warehouse, console, request), fields(account = %request.account, project = %request.project_id))]
pub async fn setup_export<W, C>(
    warehouse: &W,
    console: &C,
    request: &SetupRequest,
) -> Result<SetupOutcome, ReportError>
where
    W: WarehouseApi,
    C: SetupConsole,
{
    let SetupRequest {
        account,
        project_id,
        dataset_id,
        location,
    } = request;

    console.say("");
    console.say("=== Setting up BigQuery Billing Export ===");
    console.say("");
    console.say(&format!("Billing Account: {account}"));
    console.say(&format!("Project: {project_id}"));
    console.say(&format!("Dataset: {dataset_id}"));
    console.say(&format!("Location: {location}"));
    console.say("");

    // Step 1: access
    console.say("Step 1: Verifying project access...");
    if let Err(e) = warehouse.list_datasets(Some(1)).await {
        let hints: Vec<String> = match e.kind() {
            ErrorKind::NotFound => vec![format!("  Project '{project_id}' not found")],
            ErrorKind::PermissionDenied => vec![
                format!("  Access denied to project '{project_id}'"),
                "  - Check that you have permissions on this project".to_string(),
                "  - Verify BigQuery API is enabled".to_string(),
            ],
            _ => vec![
                String::new(),
                "Try enabling the BigQuery API:".to_string(),
                format!("  Run: {}", enable_api_command(project_id)),
            ],
        };
        return Err(step_failure(console, "Verifying project access", e, &hints));
    }
    console.say(&format!(
        "  ✓ Project '{project_id}' verified (BigQuery access confirmed)"
    ));

    // Step 2: dataset
    console.say("");
    console.say("Step 2: Creating BigQuery dataset...");
    let creation = match warehouse.create_dataset(dataset_id, location).await {
        Ok(creation) => creation,
        Err(e) => {
            let hints = vec![
                String::new(),
                "Common issues:".to_string(),
                "  - Insufficient permissions (need bigquery.datasets.create)".to_string(),
                "  - BigQuery API not enabled on project".to_string(),
                String::new(),
                "To enable BigQuery API:".to_string(),
                format!("  {}", enable_api_command(project_id)),
            ];
            return Err(step_failure(console, "Creating dataset", e, &hints));
        }
    };
    let verb = match creation {
        DatasetCreation::Created => "created",
        DatasetCreation::AlreadyExists => "already exists",
    };
    console.say(&format!("  ✓ Dataset '{dataset_id}' {verb} in {location}"));
    console.say(&format!("    Full dataset ID: {project_id}.{dataset_id}"));

    let existing_tables: Vec<String> = match warehouse.list_tables(dataset_id).await {
        Ok(tables) => tables.into_iter().map(|t| t.reference.table_id).collect(),
        Err(e) => {
            debug!(error = %e, "Could not list existing tables");
            Vec::new()
        }
    };
    if existing_tables.is_empty() {
        console.say("    Dataset is empty (no tables yet - this is expected)");
    } else {
        console.say(&format!(
            "    Existing tables in dataset: {}",
            existing_tables.len()
        ));
        for table in &existing_tables {
            console.say(&format!("      - {table}"));
        }
    }
    console.say(&format!(
        "    View dataset: {}",
        dataset_console_url(project_id, dataset_id)
    ));

    // Step 3: console
    console.say("");
    console.say("Step 3: Configuring billing export...");
    console.say("  ⚠ IMPORTANT: Billing export MUST be configured via GCP Console");
    console.say("  Google Cloud offers no API for this step.");
    console.say("");
    for line in manual_setup_steps(request) {
        console.say(&line);
    }
    console.say("");

    let url = account.export_console_url();
    console.say("Attempting to open browser automatically...");
    if console.open_url(&url).await {
        console.say("✓ Browser opened to billing export configuration page");
    } else {
        console.say("✗ Could not open browser automatically");
        console.say(&format!("  Please manually open: {url}"));
    }
    console.say("");

    let verification = if console
        .wait_for_confirmation("Press ENTER after you have completed the configuration in the Console...")
        .await
    {
        console.say("");
        console.say("Verifying configuration...");
        console.say(&format!(
            "Waiting {} seconds for GCP to create the export table...",
            VERIFY_DELAY.as_secs()
        ));
        console.pause(VERIFY_DELAY).await;
        verify_table(warehouse, console, request).await
    } else {
        console.say("Running in non-interactive mode - skipping verification...");
        console.say("You can verify the export later once you've configured it in the Console.");
        Verification::Skipped
    };

    console.say("");
    console.say("=== Setup Information ===");
    console.say("");
    console.say(&format!("Dataset: {project_id}.{dataset_id}"));
    console.say(&format!("Location: {location}"));
    console.say("");
    console.say("After configuring export in Console, billing data will appear in:");
    console.say(&format!(
        "  Table: {project_id}.{dataset_id}.{}",
        expected_table_name(account)
    ));
    console.say("");
    console.say("Data will be available ~24 hours after export is enabled.");
    console.say("");
    console.say("To verify export is working:");
    console.say(&format!("  {}", costs_command(account)));

    info!(dataset = %dataset_id, verification = ?verification, "Setup finished");
    Ok(SetupOutcome {
        dataset: creation,
        existing_tables,
        verification,
    })
}

/// Console steps that link the billing account to the dataset.
pub fn manual_setup_steps(request: &SetupRequest) -> Vec<String> {
    let SetupRequest {
        account,
        project_id,
        dataset_id,
        ..
    } = request;

    vec![
        RULE.to_string(),
        "  REQUIRED MANUAL STEP - PLEASE COMPLETE NOW".to_string(),
        RULE.to_string(),
        String::new(),
        format!("  The dataset '{dataset_id}' has already been created for you."),
        "  Now link it to your billing account.".to_string(),
        String::new(),
        "  1. Open this URL in your browser:".to_string(),
        format!("     {}", account.export_console_url()),
        String::new(),
        "  2. Click the 'BIGQUERY EXPORT' tab".to_string(),
        String::new(),
        "  3. Under 'Detailed usage cost', click 'EDIT SETTINGS'".to_string(),
        String::new(),
        "  4. In the form that opens:".to_string(),
        "     • Enable: Toggle to ON".to_string(),
        format!("     • Project dropdown: Select '{project_id}'"),
        format!("     • Dataset dropdown: Select '{dataset_id}' (already exists)"),
        String::new(),
        "  5. Click 'SAVE'".to_string(),
        String::new(),
        RULE.to_string(),
    ]
}

async fn verify_table<W, C>(warehouse: &W, console: &C, request: &SetupRequest) -> Verification
where
    W: WarehouseApi,
    C: SetupConsole,
{
    let expected = expected_table_name(&request.account);
    match warehouse.list_tables(&request.dataset_id).await {
        Ok(tables) => match match_export_table(&tables, &candidate_fragments(&request.account)) {
            Some(table) => {
                console.say(&format!(
                    "✓ Billing export table created: {}",
                    table.reference.table_id
                ));
                Verification::Found(table.reference.clone())
            }
            None => {
                console.say(&format!("⚠ Table '{expected}' not found yet"));
                console.say("  This is normal - the table may take a few minutes to appear");
                console.say("  You can verify later by running:");
                console.say(&format!(
                    "    {}",
                    list_tables_command(&request.project_id, &request.dataset_id)
                ));
                Verification::NotYet
            }
        },
        Err(e) => {
            warn!(error = %e, "Could not verify table creation");
            console.say(&format!("  Could not verify table creation: {e}"));
            Verification::Failed(e.to_string())
        }
    }
}

// ============================================================================
// Destroy
// ============================================================================

/// Destroy parameters.
#[derive(Debug, Clone)]
pub struct DestroyRequest {
    /// Billing account whose export is disabled.
    pub account: BillingAccountId,
    /// Project holding the dataset.
    pub project_id: String,
    /// Dataset receiving the export.
    pub dataset_id: String,
    /// Delete the dataset and its tables.
    pub delete_dataset: bool,
}

/// What happened to the dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetRemoval {
    /// Kept as requested.
    Kept,
    /// Deleted.
    Deleted,
    /// Did not exist.
    NotFound,
    /// Deletion failed.
    Failed(String),
}

/// Prints the steps to disable export and optionally deletes the dataset.
#[instrument(skip(warehouse, console, request), fields(account = %request.account, project = %request.project_id))]
pub async fn destroy_export<W, C>(
    warehouse: &W,
    console: &C,
    request: &DestroyRequest,
) -> Result<DatasetRemoval, ReportError>
where
    W: WarehouseApi,
    C: SetupConsole,
{
    let DestroyRequest {
        account,
        project_id,
        dataset_id,
        delete_dataset,
    } = request;

    console.say("");
    console.say("=== Destroying BigQuery Billing Export ===");
    console.say("");
    console.say(&format!("Billing Account: {account}"));
    console.say("");
    console.say("Step 1: Disabling billing export...");
    console.say("  ⚠ Note: Billing export must be disabled via GCP Console");
    console.say("");
    console.say("  Manual steps required:");
    console.say(&format!("  1. Go to: {}", account.console_url()));
    console.say("  2. Navigate to 'Billing export' → 'BigQuery export'");
    console.say("  3. Click 'EDIT SETTINGS' for 'Detailed usage cost'");
    console.say("  4. Click 'DISABLE EXPORT'");
    console.say("  5. Click 'SAVE'");
    console.say("");

    let removal = if *delete_dataset {
        console.say(&format!("Step 2: Deleting BigQuery dataset '{dataset_id}'..."));
        match warehouse.delete_dataset(dataset_id, true).await {
            Ok(true) => {
                console.say(&format!("  ✓ Dataset '{dataset_id}' deleted"));
                DatasetRemoval::Deleted
            }
            Ok(false) => {
                console.say(&format!("  ✓ Dataset '{dataset_id}' does not exist"));
                DatasetRemoval::NotFound
            }
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "Dataset deletion failed");
                console.say(&format!("  ✗ Error deleting dataset: {e}"));
                console.say("");
                console.say("To delete manually:");
                console.say(&format!(
                    "  {}",
                    delete_dataset_command(project_id, dataset_id)
                ));
                DatasetRemoval::Failed(e.to_string())
            }
        }
    } else {
        console.say(&format!("Step 2: Keeping dataset '{dataset_id}'"));
        console.say("  Dataset will remain with historical billing data");
        console.say("");
        console.say("To delete dataset later:");
        console.say(&format!(
            "  gcpbill-setup --destroy --billing-account {account} --project {project_id} --dataset {dataset_id} --delete-dataset"
        ));
        DatasetRemoval::Kept
    };

    console.say("");
    console.say("=== Destroy Complete ===");
    console.say("");
    console.say("Disable the export in the Console to stop new billing data.");
    if matches!(removal, DatasetRemoval::Deleted | DatasetRemoval::NotFound) {
        console.say(&format!("Dataset '{dataset_id}' has been deleted."));
    }

    Ok(removal)
}
