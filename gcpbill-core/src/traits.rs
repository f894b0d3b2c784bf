//! Provider traits.
//!
//! The report flows talk to Google Cloud only through these traits. The
//! REST implementations live in `gcpbill-fetch`; tests use in-memory stubs.

use std::future::Future;

use crate::error::ProviderError;
use crate::models::{
    BillingAccount, DatasetInfo, ProjectBillingInfo, QueryRequest, QueryRows, TableInfo, TableRef,
};

/// Result of a dataset creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetCreation {
    /// The dataset was created.
    Created,
    /// A dataset with that id already existed.
    AlreadyExists,
}

/// Access to the Cloud Billing API.
pub trait BillingApi: Send + Sync {
    /// Lists billing accounts visible to the credentials.
    fn list_billing_accounts(
        &self,
    ) -> impl Future<Output = Result<Vec<BillingAccount>, ProviderError>> + Send;

    /// Lists projects linked to `account_name` (`billingAccounts/<id>`).
    fn list_project_billing_info(
        &self,
        account_name: &str,
    ) -> impl Future<Output = Result<Vec<ProjectBillingInfo>, ProviderError>> + Send;
}

/// Access to BigQuery, bound to a single project.
pub trait WarehouseApi: Send + Sync {
    /// The project this client operates on.
    fn project_id(&self) -> &str;

    /// Lists datasets, at most `max_results` when given.
    fn list_datasets(
        &self,
        max_results: Option<u32>,
    ) -> impl Future<Output = Result<Vec<DatasetInfo>, ProviderError>> + Send;

    /// Lists tables in a dataset of this project.
    fn list_tables(
        &self,
        dataset_id: &str,
    ) -> impl Future<Output = Result<Vec<TableInfo>, ProviderError>> + Send;

    /// Fetches full table metadata, including row counts.
    fn get_table(
        &self,
        table: &TableRef,
    ) -> impl Future<Output = Result<TableInfo, ProviderError>> + Send;

    /// Runs a query to completion and returns all rows.
    fn run_query(
        &self,
        request: &QueryRequest,
    ) -> impl Future<Output = Result<QueryRows, ProviderError>> + Send;

    /// Creates a dataset in this project.
    fn create_dataset(
        &self,
        dataset_id: &str,
        location: &str,
    ) -> impl Future<Output = Result<DatasetCreation, ProviderError>> + Send;

    /// Deletes a dataset. Returns false if it did not exist.
    fn delete_dataset(
        &self,
        dataset_id: &str,
        delete_contents: bool,
    ) -> impl Future<Output = Result<bool, ProviderError>> + Send;
}
