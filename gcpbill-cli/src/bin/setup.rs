//! gcpbill-setup - create or tear down the BigQuery billing export.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgGroup, Parser};
use gcpbill_cli::commands::setup::{TerminalConsole, run_destroy, run_setup};
use gcpbill_cli::context::NO_PROJECT_MESSAGE;
use gcpbill_cli::{AppContext, ExitCode, setup_logging};
use gcpbill_core::{BillingAccountId, is_valid_dataset_id};
use gcpbill_fetch::CredentialResolver;
use gcpbill_report::{DestroyRequest, SetupRequest};

#[derive(Parser)]
#[command(name = "gcpbill-setup")]
#[command(about = "Set up or remove the BigQuery billing export")]
#[command(long_about = "gcpbill-setup prepares the BigQuery dataset that receives the
billing export and walks through linking it in the Cloud Console.

Examples:
  gcpbill-setup --setup --billing-account 01AB23-CD4567-EF8901 --project my-project
  gcpbill-setup --destroy --billing-account 01AB23-CD4567-EF8901 --delete-dataset")]
#[command(version)]
#[command(group(ArgGroup::new("action").required(true).args(["setup", "destroy"])))]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Create the dataset and configure the export
    #[arg(long)]
    setup: bool,

    /// Disable the export and optionally delete the dataset
    #[arg(long)]
    destroy: bool,

    /// Billing account id
    #[arg(long, value_name = "ID")]
    billing_account: BillingAccountId,

    /// Project that holds the export dataset (required for --setup)
    #[arg(long, value_name = "PROJECT_ID")]
    project: Option<String>,

    /// Dataset id (default: settings dataset, billing_export)
    #[arg(long, value_name = "DATASET")]
    dataset: Option<String>,

    /// Dataset location (default: settings location, US)
    #[arg(long, value_name = "LOCATION")]
    location: Option<String>,

    /// With --destroy, delete the dataset and all its tables
    #[arg(long)]
    delete_dataset: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Settings file path
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    match run(cli).await {
        Ok(code) => code.exit(),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::Error.exit();
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let ctx = AppContext::load(cli.config.clone()).await?;

    let dataset_id = cli
        .dataset
        .clone()
        .unwrap_or_else(|| ctx.settings.dataset.clone());
    if !is_valid_dataset_id(&dataset_id) {
        eprintln!(
            "Error: Invalid dataset id '{dataset_id}' (letters, digits and underscores only)"
        );
        return Ok(ExitCode::Error);
    }

    if cli.setup && cli.project.is_none() {
        eprintln!("Error: --project is required for --setup");
        return Ok(ExitCode::Error);
    }

    let resolver = CredentialResolver::from_env().prefer_user_credentials();
    let Ok(credentials) = ctx.authenticate(resolver).await else {
        return Ok(ExitCode::Error);
    };

    let Some(project_id) = ctx.warehouse_project(cli.project.as_deref(), &credentials) else {
        eprintln!("{NO_PROJECT_MESSAGE}");
        return Ok(ExitCode::Error);
    };
    let warehouse = AppContext::warehouse_client(&credentials, &project_id)?;
    let console = TerminalConsole::new();

    if cli.setup {
        let request = SetupRequest {
            account: cli.billing_account,
            project_id,
            dataset_id,
            location: cli
                .location
                .unwrap_or_else(|| ctx.settings.location.clone()),
        };
        run_setup(&warehouse, &console, &ctx.store, &request).await
    } else {
        let request = DestroyRequest {
            account: cli.billing_account,
            project_id,
            dataset_id,
            delete_dataset: cli.delete_dataset,
        };
        run_destroy(&warehouse, &console, &request).await
    }
}
