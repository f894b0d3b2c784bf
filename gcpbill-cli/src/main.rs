//! gcpbill - GCP billing accounts, projects and cost reports.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use clap::{CommandFactory, Parser};
use gcpbill_cli::commands::{accounts, costs};
use gcpbill_cli::context::NO_PROJECT_MESSAGE;
use gcpbill_cli::{AppContext, ExitCode, setup_logging};
use gcpbill_core::{BillingAccountId, GroupBy};
use gcpbill_fetch::CredentialResolver;
use gcpbill_store::OutputFormat;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "gcpbill")]
#[command(about = "View GCP billing accounts, projects and costs")]
#[command(long_about = "gcpbill reads Google Cloud billing data.

Costs are queried from the BigQuery billing export. Use gcpbill-setup to
create the export and gcpbill-check to diagnose it.

Examples:
  gcpbill --list-accounts
  gcpbill --list-projects --billing-account 01AB23-CD4567-EF8901
  gcpbill --costs --billing-account 01AB23-CD4567-EF8901 --group-by day
  gcpbill --costs --start-date 2025-01-01 --end-date 2025-02-01 --format csv")]
#[command(version)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// List billing accounts
    #[arg(long)]
    list_accounts: bool,

    /// List projects and their billing status
    #[arg(long)]
    list_projects: bool,

    /// Show costs from the BigQuery billing export
    #[arg(long)]
    costs: bool,

    /// Billing account id (filter for listings, required for costs)
    #[arg(long, value_name = "ID")]
    billing_account: Option<BillingAccountId>,

    /// Only include costs for this project
    #[arg(long, value_name = "PROJECT_ID")]
    project: Option<String>,

    /// First usage date, YYYY-MM-DD (default: end date minus lookback days)
    #[arg(long, value_name = "DATE")]
    start_date: Option<String>,

    /// Usage date to stop before, YYYY-MM-DD (default: today)
    #[arg(long, value_name = "DATE")]
    end_date: Option<String>,

    /// Group costs by: service, project, day, month, ai, model
    #[arg(long, value_name = "DIMENSION")]
    group_by: Option<GroupBy>,

    /// Output format: table, csv, json
    #[arg(long, value_name = "FORMAT")]
    format: Option<OutputFormat>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Settings file path
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl Cli {
    fn has_action(&self) -> bool {
        self.list_accounts || self.list_projects || self.costs
    }
}

// ============================================================================
// Main
// ============================================================================

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
    if !cli.has_action() {
        Cli::command().print_help()?;
        println!();
        return Ok(ExitCode::Success);
    }

    let ctx = AppContext::load(cli.config.clone()).await?;
    let format = cli.format.unwrap_or(ctx.settings.default_format);

    // Validate cost flags before touching the network.
    let cost_request = if cli.costs {
        let args = costs::CostArgs {
            account: ctx.billing_account(cli.billing_account.clone()),
            start_date: cli.start_date.clone(),
            end_date: cli.end_date.clone(),
            project: cli.project.clone(),
            group_by: cli.group_by,
        };
        match costs::build_request(args, &ctx.settings, Local::now().date_naive()) {
            Ok(request) => Some(request),
            Err(message) => {
                eprintln!("{message}");
                return Ok(ExitCode::Error);
            }
        }
    } else {
        None
    };

    let Ok(credentials) = ctx.authenticate(CredentialResolver::from_env()).await else {
        return Ok(ExitCode::Error);
    };
    let billing = AppContext::billing_client(&credentials)?;
    let account_filter = cli.billing_account.as_ref().map(BillingAccountId::as_str);
    let account_name = cli.billing_account.as_ref().map(BillingAccountId::resource_name);

    let mut code = ExitCode::Success;

    if cli.list_accounts {
        code = code.max(accounts::list_accounts(&billing, account_filter, format).await?);
    }

    if cli.list_projects {
        code = code.max(accounts::list_projects(&billing, account_name.as_deref(), format).await?);
    }

    if let Some(request) = cost_request {
        let Some(project_id) = ctx.warehouse_project(None, &credentials) else {
            eprintln!("{NO_PROJECT_MESSAGE}");
            return Ok(ExitCode::Error);
        };
        let warehouse = AppContext::warehouse_client(&credentials, &project_id)?;
        code = code.max(costs::run(&warehouse, request, &ctx.settings, format).await?);
    }

    Ok(code)
}
