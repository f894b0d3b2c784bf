// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # gcpbill Core
//!
//! Core types, models, and traits shared by the gcpbill crates.
//!
//! ## Key Types
//!
//! ### Billing
//! - [`BillingAccountId`] - Normalized account identifier
//! - [`BillingAccount`] - Account from the Cloud Billing API
//! - [`ProjectBillingInfo`] - Project to account linkage
//!
//! ### Warehouse
//! - [`DatasetInfo`], [`TableInfo`], [`TableRef`] - BigQuery metadata
//! - [`QueryRequest`], [`QueryRows`] - Query plumbing
//!
//! ### Reports
//! - [`GroupBy`], [`DateRange`], [`CostRow`] - Cost aggregation
//! - [`ExportHealth`], [`DateCoverage`] - Export diagnostics
//!
//! ### Traits
//! - [`BillingApi`], [`WarehouseApi`] - Provider access

pub mod error;
pub mod models;
pub mod traits;

pub use error::{CoreError, ErrorKind, ProviderError};

pub use models::{
    // Billing
    BILLING_ACCOUNT_PREFIX,
    BillingAccount,
    BillingAccountId,
    ProjectBillingInfo,
    // Warehouse
    DatasetInfo,
    QueryParameter,
    QueryRequest,
    QueryRows,
    TableInfo,
    TableRef,
    is_valid_dataset_id,
    is_valid_project_id,
    // Reports
    CostRow,
    DATE_FORMAT,
    DateCoverage,
    DateRange,
    EXPORT_GRACE_HOURS,
    ExportHealth,
    GroupBy,
    ModelPattern,
    total_cost,
};

pub use traits::{BillingApi, DatasetCreation, WarehouseApi};
