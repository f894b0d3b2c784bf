//! Report errors.

use gcpbill_core::{ErrorKind, ProviderError};
use thiserror::Error;

/// Errors that stop a report flow.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A provider call failed in a way the flow cannot recover from.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A setup or destroy step failed.
    #[error("{step} failed: {source}")]
    Step {
        /// Step description.
        step: &'static str,
        /// Underlying failure.
        #[source]
        source: ProviderError,
    },

    /// A query returned a value that could not be interpreted.
    #[error("Unexpected value in column '{column}': {value}")]
    InvalidValue {
        /// Column name.
        column: String,
        /// Raw value.
        value: String,
    },
}

impl ReportError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Provider(e) | Self::Step { source: e, .. } => e.kind(),
            Self::InvalidValue { .. } => ErrorKind::Other,
        }
    }

    /// Returns true for authentication failures.
    pub fn is_authentication(&self) -> bool {
        self.kind() == ErrorKind::Authentication
    }
}
