//! Human-readable diagnostics output.

use gcpbill_core::ExportHealth;
use gcpbill_report::{DiagnosticReport, StepStatus};

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";

/// Text formatter for diagnostic reports.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats the whole report.
    pub fn format_report(&self, report: &DiagnosticReport, credential_source: Option<&str>) -> String {
        let mut lines = vec![self.bold("=== BigQuery Billing Export Diagnostics ==="), String::new()];

        if !report.project_id.is_empty() {
            lines.push(format!("Project: {}", report.project_id));
        }
        if let Some(source) = credential_source {
            lines.push(format!("Credentials: {source}"));
        }
        if lines.len() > 2 {
            lines.push(String::new());
        }

        lines.push(self.bold("Checks:"));
        for step in &report.steps {
            lines.push(format!(
                "  {} {}: {}",
                self.status_symbol(step.status),
                step.step,
                step.summary
            ));
        }

        if !report.accounts.is_empty() {
            lines.push(String::new());
            lines.push(self.bold("Billing Accounts:"));
            for account in &report.accounts {
                let state = if account.open { "open" } else { "closed" };
                lines.push(format!(
                    "  - {} ({}) [{}]",
                    account.display_name, account.id, state
                ));
            }
        }

        if !report.datasets.is_empty() {
            lines.push(String::new());
            lines.push(self.bold(&format!("Datasets in {}:", report.project_id)));
            lines.extend(self.format_datasets(report));
        }

        if !report.exports.is_empty() {
            lines.push(String::new());
            lines.push(self.bold("Billing Export:"));
            for finding in &report.exports {
                match &finding.table {
                    Some(health) => {
                        lines.push(format!("  {}: {}", finding.account, health.table));
                        lines.push(format!("    Status: {}", self.health(&health.health)));
                        if let Some(created) = health.created_at {
                            lines.push(self.dim(&format!(
                                "    Created: {}",
                                created.format("%Y-%m-%d %H:%M:%S UTC")
                            )));
                        }
                    }
                    None => lines.push(format!(
                        "  {}: {}",
                        finding.account,
                        self.red("no export table found")
                    )),
                }
            }
        }

        if !report.recommendations.is_empty() {
            lines.push(String::new());
            lines.push(self.bold("Recommendations:"));
            for (i, rec) in report.recommendations.iter().enumerate() {
                lines.push(format!("  {}. {rec}", i + 1));
            }
        }

        if let (Some(step), Some(reason)) = (report.aborted_at, &report.abort_reason) {
            lines.push(String::new());
            lines.push(self.red(&format!("Diagnostics stopped at {step}: {reason}")));
        }

        lines.join("\n")
    }

    fn format_datasets(&self, report: &DiagnosticReport) -> Vec<String> {
        let mut lines = Vec::new();
        for summary in &report.datasets {
            let dataset = &summary.dataset;
            match &dataset.location {
                Some(location) => lines.push(format!("  - {} ({location})", dataset.dataset_id)),
                None => lines.push(format!("  - {}", dataset.dataset_id)),
            }

            if let Some(error) = &summary.error {
                lines.push(self.red(&format!("    Error listing tables: {error}")));
                continue;
            }
            if summary.tables.is_empty() {
                lines.push(self.dim("    (no tables)"));
                continue;
            }

            for table in &summary.tables {
                lines.push(format!("    - {}", table.reference.table_id));
                if let Some(created) = table.created_at {
                    lines.push(self.dim(&format!(
                        "      Created: {}",
                        created.format("%Y-%m-%d %H:%M:%S UTC")
                    )));
                }
                if let Some(rows) = table.num_rows {
                    lines.push(self.dim(&format!("      Rows: {}", group_thousands(rows))));
                }
            }
        }
        lines
    }

    fn status_symbol(&self, status: StepStatus) -> String {
        let symbol = status.symbol();
        match status {
            StepStatus::Passed => self.green(symbol),
            StepStatus::Warning => self.yellow(symbol),
            StepStatus::Failed => self.red(symbol),
            StepStatus::Skipped => self.dim(symbol),
        }
    }

    fn health(&self, health: &ExportHealth) -> String {
        let text = health.to_string();
        match health {
            ExportHealth::Working { rows } => {
                self.green(&format!("working ({} rows)", group_thousands(*rows)))
            }
            ExportHealth::Waiting { .. } | ExportHealth::Unknown => self.yellow(&text),
            ExportHealth::Misconfigured { .. } | ExportHealth::Empty => self.red(&text),
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }
}

/// Formats a count with comma separators.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
