//! Export table health and date coverage.

use chrono::{DateTime, Utc};
use gcpbill_core::{
    BillingAccountId, DateCoverage, DateRange, EXPORT_GRACE_HOURS, ExportHealth, ProviderError,
    TableInfo, TableRef, WarehouseApi,
};
use tracing::{debug, instrument};

use crate::query::{coverage_query, parse_coverage};

/// Health of one export table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableHealth {
    /// The table.
    pub table: TableRef,
    /// Creation time, when known.
    pub created_at: Option<DateTime<Utc>>,
    /// Row count from table metadata, when readable.
    pub num_rows: Option<u64>,
    /// Classification.
    pub health: ExportHealth,
}

impl TableHealth {
    /// Classifies table metadata at `now`.
    pub fn from_table(info: &TableInfo, now: DateTime<Utc>) -> Self {
        Self {
            table: info.reference.clone(),
            created_at: info.created_at,
            num_rows: info.num_rows,
            health: ExportHealth::classify(info.num_rows, info.created_at, now),
        }
    }

    /// Explanation printed when the table holds no rows.
    pub fn empty_table_notes(&self, account: &BillingAccountId) -> Vec<String> {
        let mut notes = vec!["Table exists but contains no data.".to_string()];

        if let Some(created_at) = self.created_at {
            notes.push(format!(
                "Table created: {}",
                created_at.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }

        match self.health {
            ExportHealth::Waiting {
                hours_elapsed,
                hours_remaining,
            } => {
                notes.push(format!("Time elapsed: {hours_elapsed:.1} hours"));
                notes.push(String::new());
                notes.push(format!(
                    "Data should be available in ~{hours_remaining:.1} hours ({EXPORT_GRACE_HOURS:.0} hours after creation)."
                ));
                notes.push(
                    "Billing data export typically takes up to 24 hours after table creation."
                        .to_string(),
                );
            }
            ExportHealth::Misconfigured { hours_elapsed } => {
                notes.push(format!("Time elapsed: {hours_elapsed:.1} hours"));
                notes.push(String::new());
                notes.push("It's been over 24 hours since table creation.".to_string());
                notes.push("Possible issues:".to_string());
                notes.push(
                    "  1. Billing export not configured in GCP Console (only dataset/table created)"
                        .to_string(),
                );
                notes.push("  2. No usage/costs have been incurred yet".to_string());
                notes.push("  3. Export configuration error".to_string());
                notes.push(String::new());
                notes.push("Verify billing export is enabled:".to_string());
                notes.push(format!("  {}", account.console_url()));
            }
            ExportHealth::Unknown => {
                notes[0] = "Table exists but its row count could not be read.".to_string();
                notes.push("Check BigQuery metadata access for this table.".to_string());
            }
            ExportHealth::Empty | ExportHealth::Working { .. } => {
                notes.push(
                    "Billing data export may not be configured or data hasn't been exported yet."
                        .to_string(),
                );
                notes.push("Wait ~24 hours after configuring export in GCP Console.".to_string());
            }
        }

        notes
    }
}

/// Fetches table metadata and classifies it.
#[instrument(skip(warehouse), fields(table = %table))]
pub async fn check_table_health<W: WarehouseApi>(
    warehouse: &W,
    table: &TableRef,
    now: DateTime<Utc>,
) -> Result<TableHealth, ProviderError> {
    let info = warehouse.get_table(table).await?;
    let health = TableHealth::from_table(&info, now);
    debug!(rows = ?health.num_rows, status = health.health.label(), "Table health");
    Ok(health)
}

/// Finds which usage dates a table covers. Failures yield `None`.
#[instrument(skip(warehouse), fields(table = %table))]
pub async fn check_coverage<W: WarehouseApi>(
    warehouse: &W,
    table: &TableRef,
    requested: &DateRange,
) -> Option<DateCoverage> {
    match warehouse.run_query(&coverage_query(table)).await {
        Ok(rows) => {
            let coverage = parse_coverage(&rows, requested);
            debug!(
                min = ?coverage.min_date,
                max = ?coverage.max_date,
                outside = coverage.outside_range,
                "Data coverage"
            );
            Some(coverage)
        }
        Err(e) => {
            debug!(error = %e, "Error checking date range");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn info(rows: Option<u64>, age_hours: Option<i64>, now: DateTime<Utc>) -> TableInfo {
        let mut info = TableInfo::new(
            TableRef::parse("proj-1.billing_export.gcp_billing_export_v1_01AB23_CD4567").unwrap(),
        );
        info.num_rows = rows;
        info.created_at = age_hours.map(|h| now - Duration::hours(h));
        info
    }

    #[test]
    fn test_waiting_notes() {
        let now = Utc::now();
        let account = BillingAccountId::parse("01AB23-CD4567").unwrap();
        let health = TableHealth::from_table(&info(Some(0), Some(6), now), now);
        assert_eq!(health.health.label(), "waiting");

        let notes = health.empty_table_notes(&account);
        assert!(notes.iter().any(|n| n == "Time elapsed: 6.0 hours"));
        assert!(notes.iter().any(|n| n.contains("available in ~18.0 hours")));
    }

    #[test]
    fn test_misconfigured_notes_link_console() {
        let now = Utc::now();
        let account = BillingAccountId::parse("01AB23-CD4567").unwrap();
        let health = TableHealth::from_table(&info(Some(0), Some(48), now), now);
        assert_eq!(health.health.label(), "misconfigured");

        let notes = health.empty_table_notes(&account);
        assert!(notes.iter().any(|n| n.contains("over 24 hours")));
        assert!(
            notes
                .iter()
                .any(|n| n.trim() == "https://console.cloud.google.com/billing/01AB23-CD4567")
        );
    }

    #[test]
    fn test_unknown_creation_time() {
        let now = Utc::now();
        let account = BillingAccountId::parse("01AB23-CD4567").unwrap();
        let health = TableHealth::from_table(&info(Some(0), None, now), now);
        assert_eq!(health.health, ExportHealth::Empty);
        assert!(
            health.empty_table_notes(&account)[1].contains("may not be configured")
        );
    }

    #[test]
    fn test_unreadable_row_count_is_not_empty() {
        let now = Utc::now();
        let account = BillingAccountId::parse("01AB23-CD4567").unwrap();
        let health = TableHealth::from_table(&info(None, Some(240), now), now);
        assert_eq!(health.num_rows, None);
        assert_eq!(health.health, ExportHealth::Unknown);

        let notes = health.empty_table_notes(&account);
        assert!(notes[0].contains("could not be read"));
        assert!(!notes.iter().any(|n| n.contains("over 24 hours")));
    }
}
