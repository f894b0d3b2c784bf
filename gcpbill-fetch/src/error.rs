//! Fetch error types.

use std::time::Duration;

use gcpbill_core::{ErrorKind, ProviderError};
use thiserror::Error;

// ============================================================================
// Auth Error
// ============================================================================

/// Error type for credential resolution.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential source produced a token.
    #[error("No Google credentials found. Run: gcloud auth application-default login")]
    NoCredentials,

    /// The refresh token was revoked or expired.
    #[error("Reauthentication needed. Run: gcloud auth application-default login")]
    ReauthRequired,

    /// Credential file could not be read or parsed.
    #[error("Invalid credentials file {path}: {message}")]
    InvalidFile {
        /// File path.
        path: String,
        /// Parse or IO error.
        message: String,
    },

    /// Credential type this tool cannot use.
    #[error("Unsupported credential type: {0}")]
    UnsupportedType(String),

    /// Service account key could not sign a JWT.
    #[error("Failed to sign service account assertion: {0}")]
    Signing(String),

    /// Token endpoint rejected the request.
    #[error("Token request failed: {0}")]
    TokenRequest(String),

    /// gcloud CLI failed.
    #[error("gcloud error: {0}")]
    Gcloud(String),

    /// HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<AuthError> for ProviderError {
    fn from(err: AuthError) -> Self {
        ProviderError::Authentication(err.to_string())
    }
}

// ============================================================================
// API Error
// ============================================================================

/// Error type for REST calls against Google APIs.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP 401.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// HTTP 403.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// HTTP 404.
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP 409.
    #[error("Already exists: {0}")]
    Conflict(String),

    /// Query job finished with errors.
    #[error("Query failed: {0}")]
    Query(String),

    /// Any other non-success status.
    #[error("API error {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message from the body.
        message: String,
    },

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// Transport failure.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Body did not match the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Authentication,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Query(_) => ErrorKind::Query,
            _ => ErrorKind::Other,
        }
    }
}

impl From<ApiError> for ProviderError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized(msg) => ProviderError::Authentication(msg),
            ApiError::PermissionDenied(msg) => ProviderError::PermissionDenied(msg),
            ApiError::NotFound(msg) => ProviderError::NotFound(msg),
            ApiError::Query(msg) => ProviderError::Query(msg),
            ApiError::Timeout | ApiError::Request(_) => ProviderError::Transport(err.to_string()),
            other => ProviderError::InvalidResponse(other.to_string()),
        }
    }
}

// ============================================================================
// Process Error
// ============================================================================

/// Error type for process operations.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Command not found.
    #[error("Command not found: {0}")]
    NotFound(String),

    /// Command timed out.
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    /// Non-zero exit code.
    #[error("Command exited with code {code}: {stderr}")]
    NonZeroExit {
        /// Exit code from the process.
        code: i32,
        /// Standard error output.
        stderr: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProcessError> for AuthError {
    fn from(err: ProcessError) -> Self {
        AuthError::Gcloud(err.to_string())
    }
}
