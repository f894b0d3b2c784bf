//! Domain models for gcpbill.
//!
//! ## Submodules
//!
//! - [`account`] - Billing accounts and project linkage
//! - [`dataset`] - BigQuery datasets, tables, and table references
//! - [`cost`] - Grouping, date ranges, and cost rows
//! - [`health`] - Export health classification
//! - [`query`] - Warehouse query requests and results

pub mod account;
pub mod cost;
pub mod dataset;
pub mod health;
pub mod query;

pub use account::{BILLING_ACCOUNT_PREFIX, BillingAccount, BillingAccountId, ProjectBillingInfo};
pub use cost::{
    CostRow, DATE_FORMAT, DateCoverage, DateRange, GroupBy, ModelPattern, total_cost,
};
pub use dataset::{DatasetInfo, TableInfo, TableRef, is_valid_dataset_id, is_valid_project_id};
pub use health::{EXPORT_GRACE_HOURS, ExportHealth};
pub use query::{QueryParameter, QueryRequest, QueryRows};
