//! Diagnostic reporter.
//!
//! Runs a fixed sequence of checks and collects the findings into a
//! [`DiagnosticReport`]:
//!
//! 1. **Authenticate** - credentials resolved (done by the caller)
//! 2. **ListBillingAccounts** - accounts visible to the credentials
//! 3. **CheckApi** - BigQuery reachable in the warehouse project
//! 4. **EnumerateDatasets** - datasets, tables, creation times, row counts
//! 5. **DetectExportHealth** - export table and health per account
//! 6. **Recommend** - remediation for each finding
//!
//! Only Authenticate and CheckApi abort the sequence. Any authentication
//! failure seen later is treated as an Authenticate failure.

use std::fmt;

use chrono::{DateTime, Utc};
use gcpbill_core::{
    BillingAccount, BillingAccountId, BillingApi, DatasetInfo, ErrorKind, ExportHealth,
    ProviderError, TableInfo, WarehouseApi,
};
use tracing::{debug, info, instrument, warn};

use crate::health::TableHealth;
use crate::locator::{candidate_fragments, expected_table_name, match_export_table, search_order};
use crate::remedy::{REAUTH_COMMAND, enable_api_command, setup_command};

// ============================================================================
// Steps
// ============================================================================

/// A step of the diagnostic sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticStep {
    /// Resolve credentials.
    Authenticate,
    /// List billing accounts.
    ListBillingAccounts,
    /// Check BigQuery API access.
    CheckApi,
    /// List datasets and tables.
    EnumerateDatasets,
    /// Find export tables and classify them.
    DetectExportHealth,
    /// Derive recommendations.
    Recommend,
}

impl DiagnosticStep {
    /// All steps in order.
    pub fn all() -> &'static [DiagnosticStep] {
        &[
            Self::Authenticate,
            Self::ListBillingAccounts,
            Self::CheckApi,
            Self::EnumerateDatasets,
            Self::DetectExportHealth,
            Self::Recommend,
        ]
    }

    /// Returns true if a failure at this step ends the sequence.
    pub fn aborts_on_failure(&self) -> bool {
        matches!(self, Self::Authenticate | Self::CheckApi)
    }

    /// Human-readable name.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Authenticate => "Authentication",
            Self::ListBillingAccounts => "Billing accounts",
            Self::CheckApi => "BigQuery API access",
            Self::EnumerateDatasets => "Datasets and tables",
            Self::DetectExportHealth => "Billing export",
            Self::Recommend => "Recommendations",
        }
    }
}

impl fmt::Display for DiagnosticStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Step succeeded.
    Passed,
    /// Step completed with problems.
    Warning,
    /// Step failed.
    Failed,
    /// Step did not run.
    Skipped,
}

impl StepStatus {
    /// Status marker.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Passed => "✓",
            Self::Warning => "⚠",
            Self::Failed => "✗",
            Self::Skipped => "-",
        }
    }
}

/// Result of one step.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// The step.
    pub step: DiagnosticStep,
    /// Outcome.
    pub status: StepStatus,
    /// One-line summary.
    pub summary: String,
}

// ============================================================================
// Findings
// ============================================================================

/// A dataset and its tables, with full metadata where available.
#[derive(Debug, Clone)]
pub struct DatasetSummary {
    /// The dataset.
    pub dataset: DatasetInfo,
    /// Tables in the dataset.
    pub tables: Vec<TableInfo>,
    /// Error listing the tables, if any.
    pub error: Option<String>,
}

/// Export state for one billing account.
#[derive(Debug, Clone)]
pub struct ExportFinding {
    /// The account.
    pub account: BillingAccountId,
    /// Health of the detected table; `None` when no table was found.
    pub table: Option<TableHealth>,
}

/// A remediation step.
#[derive(Debug, Clone, PartialEq)]
pub enum Recommendation {
    /// Credentials are missing or expired.
    Reauthenticate,
    /// BigQuery is unreachable in the project.
    EnableApi {
        /// Warehouse project.
        project_id: String,
    },
    /// Listing billing accounts is not permitted.
    GrantBillingAccess,
    /// No export table exists for the account.
    RunSetup {
        /// The account.
        account: BillingAccountId,
        /// Warehouse project.
        project_id: String,
    },
    /// The export table is new and still empty.
    WaitForData {
        /// The account.
        account: BillingAccountId,
        /// Hours until data is expected.
        hours_remaining: f64,
    },
    /// The export table stayed empty past the grace period.
    VerifyExport {
        /// The account.
        account: BillingAccountId,
    },
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reauthenticate => write!(f, "Re-authenticate: {REAUTH_COMMAND}"),
            Self::EnableApi { project_id } => write!(
                f,
                "Enable the BigQuery API and check your permissions: {}",
                enable_api_command(project_id)
            ),
            Self::GrantBillingAccess => write!(
                f,
                "Ask for the billing.accounts.list permission (Billing Account Viewer role)"
            ),
            Self::RunSetup {
                account,
                project_id,
            } => write!(
                f,
                "Set up billing export for {account}: {}",
                setup_command(account, Some(project_id))
            ),
            Self::WaitForData {
                account,
                hours_remaining,
            } => write!(
                f,
                "Wait for export data for {account}: expected in ~{hours_remaining:.1} hours"
            ),
            Self::VerifyExport { account } => write!(
                f,
                "Verify billing export is enabled for {account}: {}",
                account.export_console_url()
            ),
        }
    }
}

/// Findings of a diagnostic run.
#[derive(Debug, Clone)]
pub struct DiagnosticReport {
    /// Warehouse project checked.
    pub project_id: String,
    /// Per-step results, in order.
    pub steps: Vec<StepResult>,
    /// Billing accounts visible to the credentials.
    pub accounts: Vec<BillingAccount>,
    /// Datasets in the warehouse project.
    pub datasets: Vec<DatasetSummary>,
    /// Export state per checked account.
    pub exports: Vec<ExportFinding>,
    /// Remediation steps.
    pub recommendations: Vec<Recommendation>,
    /// Step that ended the sequence early.
    pub aborted_at: Option<DiagnosticStep>,
    /// Error behind the abort.
    pub abort_reason: Option<String>,
}

impl DiagnosticReport {
    fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            steps: Vec::new(),
            accounts: Vec::new(),
            datasets: Vec::new(),
            exports: Vec::new(),
            recommendations: Vec::new(),
            aborted_at: None,
            abort_reason: None,
        }
    }

    /// Report for a run whose credentials could not be resolved.
    pub fn unauthenticated(reason: impl Into<String>) -> Self {
        let mut report = Self::new(String::new());
        report.abort(DiagnosticStep::Authenticate, reason.into());
        report
    }

    /// Returns true if the sequence ended early.
    pub fn is_aborted(&self) -> bool {
        self.aborted_at.is_some()
    }

    /// Result recorded for a step.
    pub fn step(&self, step: DiagnosticStep) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.step == step)
    }

    fn record(&mut self, step: DiagnosticStep, status: StepStatus, summary: impl Into<String>) {
        self.steps.push(StepResult {
            step,
            status,
            summary: summary.into(),
        });
    }

    fn abort(&mut self, step: DiagnosticStep, reason: String) {
        warn!(step = %step, reason = %reason, "Diagnostics aborted");
        self.steps.retain(|s| s.step != step);
        self.record(step, StepStatus::Failed, reason.clone());

        let recommendation = match step {
            DiagnosticStep::CheckApi => Recommendation::EnableApi {
                project_id: self.project_id.clone(),
            },
            _ => Recommendation::Reauthenticate,
        };
        self.recommendations.push(recommendation);

        let skipped: Vec<DiagnosticStep> = DiagnosticStep::all()
            .iter()
            .copied()
            .filter(|s| self.step(*s).is_none())
            .collect();
        for later in skipped {
            self.record(later, StepStatus::Skipped, "not run");
        }
        self.steps.sort_by_key(|s| {
            DiagnosticStep::all()
                .iter()
                .position(|x| *x == s.step)
                .unwrap_or(usize::MAX)
        });
        self.aborted_at = Some(step);
        self.abort_reason = Some(reason);
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Runs the diagnostic sequence.
#[derive(Debug)]
pub struct Diagnostics<'a, B, W> {
    billing: &'a B,
    warehouse: &'a W,
    preferred_datasets: Vec<String>,
    account: Option<BillingAccountId>,
    credential_source: String,
}

impl<'a, B: BillingApi, W: WarehouseApi> Diagnostics<'a, B, W> {
    /// Creates a runner for authenticated clients.
    pub fn new(billing: &'a B, warehouse: &'a W, credential_source: impl Into<String>) -> Self {
        Self {
            billing,
            warehouse,
            preferred_datasets: Vec::new(),
            account: None,
            credential_source: credential_source.into(),
        }
    }

    /// Datasets searched first for export tables.
    pub fn with_preferred_datasets(mut self, datasets: Vec<String>) -> Self {
        self.preferred_datasets = datasets;
        self
    }

    /// Checks only this account instead of every open account.
    pub fn with_account(mut self, account: Option<BillingAccountId>) -> Self {
        self.account = account;
        self
    }

    /// Runs every step and returns the findings.
    #[instrument(skip(self, now), fields(project = self.warehouse.project_id()))]
    pub async fn run(&self, now: DateTime<Utc>) -> DiagnosticReport {
        let mut report = DiagnosticReport::new(self.warehouse.project_id());
        report.record(
            DiagnosticStep::Authenticate,
            StepStatus::Passed,
            format!("credentials from {}", self.credential_source),
        );

        // ListBillingAccounts
        match self.billing.list_billing_accounts().await {
            Ok(accounts) => {
                let open = accounts.iter().filter(|a| a.open).count();
                report.record(
                    DiagnosticStep::ListBillingAccounts,
                    if accounts.is_empty() {
                        StepStatus::Warning
                    } else {
                        StepStatus::Passed
                    },
                    format!("{} account(s), {open} open", accounts.len()),
                );
                report.accounts = accounts;
            }
            Err(e) if e.kind() == ErrorKind::Authentication => {
                report.abort(DiagnosticStep::Authenticate, e.to_string());
                return report;
            }
            Err(e) => {
                report.record(
                    DiagnosticStep::ListBillingAccounts,
                    StepStatus::Warning,
                    e.to_string(),
                );
                report.recommendations.push(Recommendation::GrantBillingAccess);
            }
        }

        // CheckApi
        if let Err(e) = self.warehouse.list_datasets(Some(1)).await {
            let step = if e.kind() == ErrorKind::Authentication {
                DiagnosticStep::Authenticate
            } else {
                DiagnosticStep::CheckApi
            };
            report.abort(step, e.to_string());
            return report;
        }
        report.record(
            DiagnosticStep::CheckApi,
            StepStatus::Passed,
            format!("BigQuery reachable in project '{}'", report.project_id),
        );

        // EnumerateDatasets
        match self.enumerate_datasets().await {
            Ok(datasets) => {
                let tables: usize = datasets.iter().map(|d| d.tables.len()).sum();
                let failed = datasets.iter().filter(|d| d.error.is_some()).count();
                report.record(
                    DiagnosticStep::EnumerateDatasets,
                    if failed == 0 {
                        StepStatus::Passed
                    } else {
                        StepStatus::Warning
                    },
                    format!("{} dataset(s), {tables} table(s)", datasets.len()),
                );
                report.datasets = datasets;
            }
            Err(e) if e.kind() == ErrorKind::Authentication => {
                report.abort(DiagnosticStep::Authenticate, e.to_string());
                return report;
            }
            Err(e) => report.record(
                DiagnosticStep::EnumerateDatasets,
                StepStatus::Warning,
                e.to_string(),
            ),
        }

        // DetectExportHealth
        let targets = self.target_accounts(&report.accounts);
        report.exports = targets
            .into_iter()
            .map(|account| self.detect_export(account, &report.datasets, now))
            .collect();
        let working = report
            .exports
            .iter()
            .filter(|f| f.table.as_ref().is_some_and(|t| t.health.is_working()))
            .count();
        report.record(
            DiagnosticStep::DetectExportHealth,
            if report.exports.is_empty() || working < report.exports.len() {
                StepStatus::Warning
            } else {
                StepStatus::Passed
            },
            format!(
                "{working} of {} account export(s) working",
                report.exports.len()
            ),
        );

        // Recommend
        let derived = recommendations_for(&report.exports, &report.project_id);
        report.recommendations.extend(derived);
        report.record(
            DiagnosticStep::Recommend,
            StepStatus::Passed,
            format!("{} recommendation(s)", report.recommendations.len()),
        );

        info!(
            accounts = report.accounts.len(),
            datasets = report.datasets.len(),
            recommendations = report.recommendations.len(),
            "Diagnostics complete"
        );
        report
    }

    async fn enumerate_datasets(&self) -> Result<Vec<DatasetSummary>, ProviderError> {
        let datasets = self.warehouse.list_datasets(None).await?;
        let mut summaries = Vec::with_capacity(datasets.len());

        for dataset in datasets {
            let mut summary = DatasetSummary {
                dataset,
                tables: Vec::new(),
                error: None,
            };

            match self.warehouse.list_tables(&summary.dataset.dataset_id).await {
                Ok(tables) => {
                    for table in tables {
                        match self.warehouse.get_table(&table.reference).await {
                            Ok(full) => summary.tables.push(full),
                            Err(e) if e.is_fatal() => return Err(e),
                            Err(e) => {
                                debug!(table = %table.reference, error = %e, "Could not read table metadata");
                                summary.tables.push(table);
                            }
                        }
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => summary.error = Some(e.to_string()),
            }

            summaries.push(summary);
        }

        Ok(summaries)
    }

    fn target_accounts(&self, accounts: &[BillingAccount]) -> Vec<BillingAccountId> {
        if let Some(account) = &self.account {
            return vec![account.clone()];
        }
        accounts
            .iter()
            .filter(|a| a.open)
            .filter_map(|a| BillingAccountId::parse(&a.id).ok())
            .collect()
    }

    fn detect_export(
        &self,
        account: BillingAccountId,
        datasets: &[DatasetSummary],
        now: DateTime<Utc>,
    ) -> ExportFinding {
        let fragments = candidate_fragments(&account);
        let infos: Vec<DatasetInfo> = datasets.iter().map(|d| d.dataset.clone()).collect();

        let table = search_order(&infos, &self.preferred_datasets)
            .iter()
            .filter_map(|id| datasets.iter().find(|d| &d.dataset.dataset_id == id))
            .find_map(|d| match_export_table(&d.tables, &fragments))
            .map(|info| TableHealth::from_table(info, now));

        match &table {
            Some(t) => debug!(account = %account, table = %t.table, status = t.health.label(), "Export table found"),
            None => debug!(account = %account, expected = %expected_table_name(&account), "Export table not found"),
        }

        ExportFinding { account, table }
    }
}

/// Recommendations for a set of export findings.
pub fn recommendations_for(findings: &[ExportFinding], project_id: &str) -> Vec<Recommendation> {
    findings
        .iter()
        .filter_map(|finding| {
            let account = finding.account.clone();
            match finding.table.as_ref().map(|t| t.health) {
                None => Some(Recommendation::RunSetup {
                    account,
                    project_id: project_id.to_string(),
                }),
                Some(ExportHealth::Waiting {
                    hours_remaining, ..
                }) => Some(Recommendation::WaitForData {
                    account,
                    hours_remaining,
                }),
                Some(ExportHealth::Misconfigured { .. } | ExportHealth::Empty) => {
                    Some(Recommendation::VerifyExport { account })
                }
                Some(ExportHealth::Working { .. } | ExportHealth::Unknown) => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_auth_and_api_abort() {
        let aborting: Vec<_> = DiagnosticStep::all()
            .iter()
            .filter(|s| s.aborts_on_failure())
            .collect();
        assert_eq!(
            aborting,
            vec![&DiagnosticStep::Authenticate, &DiagnosticStep::CheckApi]
        );
    }

    #[test]
    fn test_unauthenticated_report() {
        let report = DiagnosticReport::unauthenticated("no credentials");
        assert_eq!(report.aborted_at, Some(DiagnosticStep::Authenticate));
        assert_eq!(report.recommendations, vec![Recommendation::Reauthenticate]);
        assert_eq!(report.steps.len(), DiagnosticStep::all().len());
        assert_eq!(report.steps[0].status, StepStatus::Failed);
        assert!(report.steps[1..].iter().all(|s| s.status == StepStatus::Skipped));
    }

    #[test]
    fn test_recommendations_for_findings() {
        let account = BillingAccountId::parse("01AB23-CD4567").unwrap();
        let findings = vec![ExportFinding {
            account: account.clone(),
            table: None,
        }];
        let recs = recommendations_for(&findings, "proj-1");
        assert_eq!(
            recs[0].to_string(),
            "Set up billing export for 01AB23-CD4567: gcpbill-setup --setup --billing-account 01AB23-CD4567 --project proj-1"
        );
    }
}
