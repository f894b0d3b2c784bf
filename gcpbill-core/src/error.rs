//! Core error types for `gcpbill`.

use thiserror::Error;

/// Validation errors for domain values.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Billing account identifier is empty or malformed.
    #[error("Invalid billing account: {0}")]
    InvalidBillingAccount(String),

    /// Table reference is not `project.dataset.table`.
    #[error("Invalid table reference: {0}")]
    InvalidTableRef(String),

    /// Date is not `YYYY-MM-DD`.
    #[error("Invalid date '{0}': dates must be in YYYY-MM-DD format")]
    InvalidDate(String),

    /// Start date is not before the end date.
    #[error("Invalid date range: start {start} must be before end {end}")]
    InvalidDateRange {
        /// Requested start.
        start: String,
        /// Requested end.
        end: String,
    },

    /// Unknown grouping dimension or output format.
    #[error("Unknown value: {0}")]
    UnknownValue(String),
}

/// How a provider failure should be treated by the report flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credentials missing, expired, or rejected. Fatal.
    Authentication,
    /// The caller lacks a permission for this step. Reported, non-fatal.
    PermissionDenied,
    /// The resource does not exist yet. Reported as "not configured".
    NotFound,
    /// A BigQuery job failed. Logged, yields an empty result.
    Query,
    /// Transport or response problems.
    Other,
}

/// Error returned by [`BillingApi`](crate::BillingApi) and
/// [`WarehouseApi`](crate::WarehouseApi) implementations.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Credentials rejected or unavailable.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// HTTP 403 or an equivalent permission error.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// HTTP 404.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Query job reported errors.
    #[error("Query failed: {0}")]
    Query(String),

    /// Network failure or timeout.
    #[error("Request failed: {0}")]
    Transport(String),

    /// Unexpected status or body.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Query(_) => ErrorKind::Query,
            Self::Transport(_) | Self::InvalidResponse(_) => ErrorKind::Other,
        }
    }

    /// Returns true if the run cannot continue.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Authentication
    }
}
