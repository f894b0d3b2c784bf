//! gcpbill-check - diagnose the BigQuery billing export.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use gcpbill_cli::commands::check;
use gcpbill_cli::context::NO_PROJECT_MESSAGE;
use gcpbill_cli::output::TextFormatter;
use gcpbill_cli::{AppContext, ExitCode, setup_logging};
use gcpbill_core::BillingAccountId;
use gcpbill_fetch::CredentialResolver;

#[derive(Parser)]
#[command(name = "gcpbill-check")]
#[command(about = "Diagnose the BigQuery billing export")]
#[command(long_about = "gcpbill-check walks through authentication, billing account access,
BigQuery access, the datasets in the project and the health of each
billing export table, then prints recommendations.

Examples:
  gcpbill-check
  gcpbill-check --billing-account 01AB23-CD4567-EF8901 --project my-project")]
#[command(version)]
struct Cli {
    /// Only check this billing account (default: every open account)
    #[arg(long, value_name = "ID")]
    billing_account: Option<BillingAccountId>,

    /// Project to inspect (default: settings, then credentials)
    #[arg(long, value_name = "PROJECT_ID")]
    project: Option<String>,

    /// Disable colors
    #[arg(long)]
    no_color: bool,

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
    let formatter = TextFormatter::new(!cli.no_color && std::io::stdout().is_terminal());

    let credentials = match ctx.authenticate(CredentialResolver::from_env()).await {
        Ok(credentials) => credentials,
        Err(e) => return Ok(check::report_unauthenticated(&e.to_string(), &formatter)),
    };

    let Some(project_id) = ctx.warehouse_project(cli.project.as_deref(), &credentials) else {
        eprintln!("{NO_PROJECT_MESSAGE}");
        return Ok(ExitCode::Error);
    };

    let billing = AppContext::billing_client(&credentials)?;
    let warehouse = AppContext::warehouse_client(&credentials, &project_id)?;
    let source = credentials.source().to_string();

    Ok(check::run(
        &billing,
        &warehouse,
        &ctx.settings,
        cli.billing_account,
        &source,
        &formatter,
    )
    .await)
}
