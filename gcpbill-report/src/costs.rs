//! Cost report flow.
//!
//! Locate the export table, make sure it holds data, then run the grouped
//! query. Every step that cannot produce rows ends the flow with an outcome
//! describing why, instead of an error.

use chrono::{DateTime, Utc};
use gcpbill_core::{
    BillingAccountId, CostRow, DateCoverage, DateRange, GroupBy, ModelPattern,
    TableRef, WarehouseApi,
};
use tracing::{debug, info, instrument, warn};

use crate::error::ReportError;
use crate::health::{TableHealth, check_coverage, check_table_health};
use crate::locator::ExportLocator;
use crate::query::{CostQueryBuilder, parse_cost_rows};
use crate::remedy::{CONSOLE_EXPORT_PATH, setup_command};

/// Parameters of one cost report.
#[derive(Debug, Clone)]
pub struct CostRequest {
    /// Billing account whose export is queried.
    pub account: BillingAccountId,
    /// Usage dates, `[start, end)`.
    pub range: DateRange,
    /// Optional project id filter.
    pub project: Option<String>,
    /// Grouping dimension.
    pub group_by: GroupBy,
}

/// How a cost report ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CostOutcome {
    /// No export table for the account.
    ExportNotFound,
    /// The table exists but holds no rows.
    NoData(TableHealth),
    /// The query failed.
    QueryFailed(String),
    /// The query ran; rows may be empty.
    Rows(Vec<CostRow>),
}

/// Result of a cost report.
#[derive(Debug, Clone)]
pub struct CostReport {
    /// The request.
    pub request: CostRequest,
    /// Export table used, when found.
    pub table: Option<TableRef>,
    /// Dates present in the table, when known.
    pub coverage: Option<DateCoverage>,
    /// Outcome.
    pub outcome: CostOutcome,
}

impl CostReport {
    /// Cost rows, empty unless the query produced some.
    pub fn rows(&self) -> &[CostRow] {
        match &self.outcome {
            CostOutcome::Rows(rows) => rows,
            _ => &[],
        }
    }

    /// Human-readable messages explaining the outcome.
    pub fn notices(&self) -> Vec<String> {
        let account = &self.request.account;
        let mut notes = Vec::new();

        match &self.outcome {
            CostOutcome::ExportNotFound => {
                notes.push(format!(
                    "BigQuery billing export not found for account: {account}"
                ));
                notes.push(String::new());
                notes.push("To enable billing export:".to_string());
                notes.push(format!("  1. Run: {}", setup_command(account, None)));
                notes.push(format!("  2. Or manually configure in {CONSOLE_EXPORT_PATH}"));
                notes.push(String::new());
                notes.push(
                    "Note: Billing data becomes available ~24 hours after export is enabled."
                        .to_string(),
                );
                notes.push(String::new());
                notes.push(
                    "Tip: Run with --debug to see which datasets and tables were searched"
                        .to_string(),
                );
                return notes;
            }
            CostOutcome::NoData(health) => {
                notes.extend(self.table_notice());
                notes.push(String::new());
                notes.extend(health.empty_table_notes(account));
            }
            CostOutcome::QueryFailed(message) => {
                notes.extend(self.table_notice());
                notes.push(format!("Error querying BigQuery: {message}"));
            }
            CostOutcome::Rows(rows) => {
                notes.extend(self.table_notice());
                if rows.is_empty() {
                    notes.push(String::new());
                    notes.push(format!(
                        "No costs found in requested range: {} to {}",
                        self.request.range.start_str(),
                        self.request.range.end_str()
                    ));
                    if let Some(coverage) = self.coverage.filter(DateCoverage::has_data) {
                        if let (Some(min), Some(max)) = (coverage.min_date, coverage.max_date) {
                            notes.push(format!("Available data range: {min} to {max}"));
                        }
                        if coverage.outside_range {
                            notes.push(
                                "Your requested date range is outside the available billing data."
                                    .to_string(),
                            );
                        }
                    }
                }
            }
        }

        notes
    }

    fn table_notice(&self) -> Option<String> {
        self.table
            .as_ref()
            .map(|t| format!("Using BigQuery table: {t}"))
    }
}

// ============================================================================
// Reporter
// ============================================================================

/// Runs cost reports against one warehouse project.
#[derive(Debug)]
pub struct CostReporter<'a, W> {
    warehouse: &'a W,
    preferred_datasets: Vec<String>,
    model_patterns: Vec<ModelPattern>,
}

impl<'a, W: WarehouseApi> CostReporter<'a, W> {
    /// Creates a reporter.
    pub fn new(warehouse: &'a W, preferred_datasets: Vec<String>) -> Self {
        Self {
            warehouse,
            preferred_datasets,
            model_patterns: Vec::new(),
        }
    }

    /// Adds model patterns checked before the built-in list.
    pub fn with_model_patterns(mut self, patterns: Vec<ModelPattern>) -> Self {
        self.model_patterns = patterns;
        self
    }

    /// Runs the report.
    ///
    /// Only authentication failures are returned as errors; everything else
    /// ends up in the report outcome.
    #[instrument(skip(self, request, now), fields(account = %request.account, group_by = %request.group_by))]
    pub async fn run(
        &self,
        request: CostRequest,
        now: DateTime<Utc>,
    ) -> Result<CostReport, ReportError> {
        let locator = ExportLocator::new(self.warehouse, self.preferred_datasets.clone());
        let Some(table) = locator.locate(&request.account).await else {
            info!("Billing export table not found");
            return Ok(CostReport {
                request,
                table: None,
                coverage: None,
                outcome: CostOutcome::ExportNotFound,
            });
        };

        match check_table_health(self.warehouse, &table, now).await {
            Ok(health) if health.num_rows == Some(0) => {
                return Ok(CostReport {
                    request,
                    table: Some(table),
                    coverage: None,
                    outcome: CostOutcome::NoData(health),
                });
            }
            Ok(health) if health.num_rows.is_none() => {
                warn!("Table metadata has no row count, querying anyway");
            }
            Ok(_) => {}
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => warn!(error = %e, "Could not read table metadata, querying anyway"),
        }

        let coverage = check_coverage(self.warehouse, &table, &request.range).await;

        let query = CostQueryBuilder::new(table.clone(), request.range)
            .group_by(request.group_by)
            .project(request.project.clone())
            .extra_model_patterns(&self.model_patterns)
            .build();
        debug!(sql = %query.sql, "Generated query");

        let outcome = match self.warehouse.run_query(&query).await {
            Ok(rows) => match parse_cost_rows(&rows, request.group_by) {
                Ok(rows) => CostOutcome::Rows(rows),
                Err(e) => CostOutcome::QueryFailed(e.to_string()),
            },
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "Cost query failed");
                CostOutcome::QueryFailed(e.to_string())
            }
        };

        Ok(CostReport {
            request,
            table: Some(table),
            coverage,
            outcome,
        })
    }
}
