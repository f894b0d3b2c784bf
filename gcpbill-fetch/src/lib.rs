// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # gcpbill Fetch
//!
//! Credentials and REST clients for Google Cloud.
//!
//! ## Credentials
//!
//! - [`credentials::CredentialResolver`] - ADC files, service account keys,
//!   and the `gcloud` CLI
//!
//! ## Host APIs
//!
//! - [`host::http`] - Authenticated HTTP client and status classification
//! - [`host::process`] - Subprocess execution for CLI tools
//!
//! ## REST Clients
//!
//! - [`billing::BillingClient`] - Cloud Billing, implements [`gcpbill_core::BillingApi`]
//! - [`bigquery::BigQueryClient`] - BigQuery, implements [`gcpbill_core::WarehouseApi`]
//!
//! ## Example
//!
//! ```ignore
//! use gcpbill_fetch::{BigQueryClient, CredentialResolver};
//!
//! let creds = CredentialResolver::from_env().resolve().await?;
//! let bq = BigQueryClient::new(creds.http_client()?, "my-project");
//! let datasets = bq.datasets(None).await?;
//! ```

pub mod bigquery;
pub mod billing;
pub mod credentials;
pub mod error;
pub mod host;

// Errors
pub use error::{ApiError, AuthError, ProcessError};

// Credentials
pub use credentials::{CredentialResolver, CredentialSource, Credentials, CredentialsFile};

// Host APIs
pub use host::{
    http::HttpClient,
    process::{ProcessOutput, ProcessRunner},
};

// REST clients
pub use bigquery::{BIGQUERY_API_BASE, BigQueryClient};
pub use billing::{BILLING_API_BASE, BillingClient};
