//! `--costs`: grouped cost report.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use gcpbill_core::{BillingAccountId, CoreError, DateRange, GroupBy, WarehouseApi};
use gcpbill_report::{CostReporter, CostRequest};
use gcpbill_store::{OutputFormat, Settings};

use crate::ExitCode;
use crate::context::print_auth_help;
use crate::output::{self, notice, total_line};

/// Cost flags as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CostArgs {
    /// Billing account, after the settings fallback.
    pub account: Option<BillingAccountId>,
    /// `--start-date`.
    pub start_date: Option<String>,
    /// `--end-date`.
    pub end_date: Option<String>,
    /// Project id filter.
    pub project: Option<String>,
    /// `--group-by`, when given.
    pub group_by: Option<GroupBy>,
}

/// Validates the flags into a request. The error is the message to print.
pub fn build_request(
    args: CostArgs,
    settings: &Settings,
    today: NaiveDate,
) -> Result<CostRequest, String> {
    let account = args
        .account
        .ok_or_else(|| "Error: --billing-account is required for cost analysis".to_string())?;

    let range = DateRange::resolve(
        args.start_date.as_deref(),
        args.end_date.as_deref(),
        today,
        settings.lookback_days,
    )
    .map_err(|e| match e {
        CoreError::InvalidDate(_) => "Error: Dates must be in YYYY-MM-DD format".to_string(),
        other => format!("Error: {other}"),
    })?;

    Ok(CostRequest {
        account,
        range,
        project: args.project.filter(|p| !p.is_empty()),
        group_by: args.group_by.unwrap_or(settings.default_group_by),
    })
}

/// Runs the report and prints rows, notices and the total.
pub async fn run<W: WarehouseApi>(
    warehouse: &W,
    request: CostRequest,
    settings: &Settings,
    format: OutputFormat,
) -> Result<ExitCode> {
    notice(format, "");
    notice(
        format,
        &format!(
            "=== Billing Costs ({} to {}) ===",
            request.range.start_str(),
            request.range.end_str()
        ),
    );
    notice(format, "");

    let reporter = CostReporter::new(warehouse, settings.search_datasets())
        .with_model_patterns(settings.model_patterns.clone());

    let report = match reporter.run(request, Utc::now()).await {
        Ok(report) => report,
        Err(e) if e.is_authentication() => {
            print_auth_help(&e.to_string());
            return Ok(ExitCode::Error);
        }
        Err(e) => return Err(e.into()),
    };

    for line in report.notices() {
        notice(format, &line);
    }
    notice(format, "");

    output::print(report.rows(), format)?;
    if format == OutputFormat::Table {
        println!();
        println!("{}", total_line(report.rows()));
    }

    Ok(ExitCode::Success)
}
