//! `gcpbill-check`: step-by-step export diagnostics.

use chrono::Utc;
use gcpbill_core::{BillingAccountId, BillingApi, WarehouseApi};
use gcpbill_report::{DiagnosticReport, Diagnostics};
use gcpbill_store::Settings;
use tracing::info;

use crate::ExitCode;
use crate::output::TextFormatter;

/// Runs the diagnostic sequence and prints the report.
///
/// Exits with an error when the sequence was aborted.
pub async fn run<B, W>(
    billing: &B,
    warehouse: &W,
    settings: &Settings,
    account: Option<BillingAccountId>,
    credential_source: &str,
    formatter: &TextFormatter,
) -> ExitCode
where
    B: BillingApi,
    W: WarehouseApi,
{
    let report = Diagnostics::new(billing, warehouse, credential_source)
        .with_preferred_datasets(settings.search_datasets())
        .with_account(account)
        .run(Utc::now())
        .await;

    println!("{}", formatter.format_report(&report, Some(credential_source)));
    exit_code(&report)
}

/// Prints the report for a run that never authenticated.
pub fn report_unauthenticated(reason: &str, formatter: &TextFormatter) -> ExitCode {
    let report = DiagnosticReport::unauthenticated(reason);
    println!("{}", formatter.format_report(&report, None));
    exit_code(&report)
}

fn exit_code(report: &DiagnosticReport) -> ExitCode {
    if let Some(step) = report.aborted_at {
        info!(step = %step, "Diagnostics aborted");
        ExitCode::Error
    } else {
        ExitCode::Success
    }
}
