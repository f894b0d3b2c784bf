// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # gcpbill report flows
//!
//! Everything the binaries do after authenticating, written against the
//! [`BillingApi`](gcpbill_core::BillingApi) and
//! [`WarehouseApi`](gcpbill_core::WarehouseApi) traits:
//!
//! | Module | Flow |
//! |--------|------|
//! | [`accounts`] | Billing account and project listing |
//! | [`locator`] | Export table detection |
//! | [`query`] | Grouped cost SQL and result parsing |
//! | [`health`] | Export table health and date coverage |
//! | [`costs`] | Cost report |
//! | [`diagnostics`] | Step-by-step export diagnostics |
//! | [`setup`] | Export setup and teardown |
//!
//! ## Usage
//!
//! ```ignore
//! use gcpbill_report::{CostReporter, CostRequest};
//!
//! let reporter = CostReporter::new(&bigquery, settings.search_datasets());
//! let report = reporter.run(request, Utc::now()).await?;
//! for line in report.notices() {
//!     println!("{line}");
//! }
//! ```

pub mod accounts;
pub mod costs;
pub mod diagnostics;
pub mod error;
pub mod health;
pub mod locator;
pub mod query;
pub mod remedy;
pub mod setup;

#[cfg(test)]
mod flow_tests;

pub use accounts::{
    ListingFailure, ProjectListing, account_list_hints, list_accounts, list_projects,
};
pub use costs::{CostOutcome, CostReport, CostReporter, CostRequest};
pub use diagnostics::{
    DatasetSummary, DiagnosticReport, DiagnosticStep, Diagnostics, ExportFinding,
    Recommendation, StepResult, StepStatus,
};
pub use error::ReportError;
pub use health::{TableHealth, check_coverage, check_table_health};
pub use locator::{ExportLocator, candidate_fragments, expected_table_name};
pub use query::{CostQueryBuilder, builtin_model_patterns, coverage_query};
pub use setup::{
    DatasetRemoval, DestroyRequest, SetupConsole, SetupOutcome, SetupRequest, Verification,
    destroy_export, setup_export,
};
