//! Billing export table detection.
//!
//! Export tables are named after the billing account with dashes replaced by
//! underscores, e.g. `gcp_billing_export_v1_01AB23_CD4567_EF8901`. The
//! locator searches the preferred datasets first, then every other dataset
//! in the project, and returns the first table whose name contains one of
//! the candidate fragments.

use gcpbill_core::{BillingAccountId, DatasetInfo, ProviderError, TableInfo, TableRef, WarehouseApi};
use tracing::{debug, instrument};

/// Prefixes of the standard and detailed (resource-level) export tables.
pub const EXPORT_TABLE_PREFIXES: &[&str] = &[
    "gcp_billing_export_v1_",
    "gcp_billing_export_resource_v1_",
];

/// Name of the standard export table for an account.
pub fn expected_table_name(account: &BillingAccountId) -> String {
    format!("{}{}", EXPORT_TABLE_PREFIXES[0], account.normalized())
}

/// Name fragments that identify an account's export tables.
pub fn candidate_fragments(account: &BillingAccountId) -> Vec<String> {
    let normalized = account.normalized();
    EXPORT_TABLE_PREFIXES
        .iter()
        .map(|prefix| format!("{prefix}{normalized}"))
        .collect()
}

/// Returns the first table whose id contains any fragment.
pub fn match_export_table<'t, I>(tables: I, fragments: &[String]) -> Option<&'t TableInfo>
where
    I: IntoIterator<Item = &'t TableInfo>,
{
    tables.into_iter().find(|t| {
        fragments
            .iter()
            .any(|f| t.reference.table_id.contains(f.as_str()))
    })
}

/// Orders dataset ids for searching: preferred ids that exist, then the rest.
pub fn search_order(datasets: &[DatasetInfo], preferred: &[String]) -> Vec<String> {
    let available: Vec<&str> = datasets.iter().map(|d| d.dataset_id.as_str()).collect();

    let mut order: Vec<String> = preferred
        .iter()
        .filter(|p| available.contains(&p.as_str()))
        .cloned()
        .collect();
    order.dedup();

    for id in available {
        if !order.iter().any(|o| o == id) {
            order.push(id.to_string());
        }
    }
    order
}

// ============================================================================
// Locator
// ============================================================================

/// Finds an account's export table in the warehouse project.
#[derive(Debug)]
pub struct ExportLocator<'a, W> {
    warehouse: &'a W,
    preferred_datasets: Vec<String>,
}

impl<'a, W: WarehouseApi> ExportLocator<'a, W> {
    /// Creates a locator that searches `preferred_datasets` first.
    pub fn new(warehouse: &'a W, preferred_datasets: Vec<String>) -> Self {
        Self {
            warehouse,
            preferred_datasets,
        }
    }

    /// Locates the export table. Provider errors count as "not found".
    #[instrument(skip(self), fields(project = self.warehouse.project_id(), account = %account))]
    pub async fn locate(&self, account: &BillingAccountId) -> Option<TableRef> {
        match self.search(account).await {
            Ok(found) => found,
            Err(e) => {
                debug!(error = %e, "Error during detection");
                None
            }
        }
    }

    async fn search(&self, account: &BillingAccountId) -> Result<Option<TableRef>, ProviderError> {
        let fragments = candidate_fragments(account);
        debug!(patterns = ?fragments, "Looking for billing export table");

        let datasets = self.warehouse.list_datasets(None).await?;
        debug!(count = datasets.len(), "Found datasets");

        for dataset_id in search_order(&datasets, &self.preferred_datasets) {
            debug!(dataset = %dataset_id, "Checking dataset");
            let tables = self.warehouse.list_tables(&dataset_id).await?;
            debug!(dataset = %dataset_id, count = tables.len(), "Found tables");
            for table in &tables {
                debug!(table = %table.reference.table_id, "Table");
            }

            if let Some(table) = match_export_table(&tables, &fragments) {
                debug!(table = %table.reference, "Found billing export table");
                return Ok(Some(table.reference.clone()));
            }
        }

        debug!(
            expected = %expected_table_name(account),
            "No matching billing export table found"
        );
        Ok(None)
    }
}
