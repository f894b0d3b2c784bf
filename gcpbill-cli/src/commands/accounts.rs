//! `--list-accounts` and `--list-projects`.

use anyhow::Result;
use gcpbill_core::BillingApi;
use gcpbill_report::{ReportError, account_list_hints};
use gcpbill_store::OutputFormat;

use crate::ExitCode;
use crate::output::{self, AccountRow, ProjectRow, notice};

fn section(format: OutputFormat, title: &str) {
    notice(format, "");
    notice(format, &format!("=== {title} ==="));
    notice(format, "");
}

/// Lists billing accounts whose resource name contains `filter`.
pub async fn list_accounts<B: BillingApi>(
    billing: &B,
    filter: Option<&str>,
    format: OutputFormat,
) -> Result<ExitCode> {
    section(format, "Billing Accounts");

    match gcpbill_report::list_accounts(billing, filter).await {
        Ok(accounts) => {
            let rows: Vec<AccountRow> = accounts.iter().map(AccountRow::from).collect();
            output::print(&rows, format)?;
            Ok(ExitCode::Success)
        }
        Err(e) => {
            eprintln!("Error listing billing accounts: {e}");
            if let ReportError::Provider(source) = &e {
                eprintln!();
                for hint in account_list_hints(source) {
                    eprintln!("{hint}");
                }
            }
            Ok(if e.is_authentication() {
                ExitCode::Error
            } else {
                ExitCode::Success
            })
        }
    }
}

/// Lists projects linked to `account`, or to every visible account.
pub async fn list_projects<B: BillingApi>(
    billing: &B,
    account: Option<&str>,
    format: OutputFormat,
) -> Result<ExitCode> {
    section(format, "Projects with Billing Status");

    let listing = gcpbill_report::list_projects(billing, account).await;
    let mut code = ExitCode::Success;
    for failure in &listing.failures {
        match &failure.account {
            Some(account) => eprintln!("Error listing projects for {account}: {}", failure.error),
            None => eprintln!("Error listing billing accounts: {}", failure.error),
        }
        if failure.error.is_fatal() {
            code = ExitCode::Error;
        }
    }

    let rows: Vec<ProjectRow> = listing.projects.iter().map(ProjectRow::from).collect();
    output::print(&rows, format)?;
    Ok(code)
}
