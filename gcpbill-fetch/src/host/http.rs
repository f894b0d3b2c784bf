//! HTTP client for Google REST APIs.
//!
//! Wraps `reqwest` with:
//! - Bearer authentication and the `x-goog-user-project` quota header
//! - Request/response tracing
//! - Status code classification into [`ApiError`]

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::error::ApiError;

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent string for gcpbill.
const USER_AGENT: &str = concat!("gcpbill/", env!("CARGO_PKG_VERSION"));

/// Header naming the project charged for API quota.
const QUOTA_PROJECT_HEADER: &str = "x-goog-user-project";

// ============================================================================
// HTTP Client
// ============================================================================

/// Authenticated HTTP client for Google APIs.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    access_token: Option<String>,
    quota_project: Option<String>,
}

impl HttpClient {
    /// Creates an unauthenticated client with the default timeout.
    pub fn new() -> Result<Self, ApiError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates an unauthenticated client with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ApiError> {
        let inner = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            inner,
            access_token: None,
            quota_project: None,
        })
    }

    /// Creates a client that sends `access_token` as a bearer token.
    pub fn authenticated(access_token: impl Into<String>) -> Result<Self, ApiError> {
        Ok(Self::new()?.with_access_token(access_token))
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    /// Sets the quota project header.
    #[must_use]
    pub fn with_quota_project(mut self, project: Option<String>) -> Self {
        self.quota_project = project.filter(|p| !p.is_empty());
        self
    }

    /// Returns the quota project, if any.
    pub fn quota_project(&self) -> Option<&str> {
        self.quota_project.as_deref()
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        match &self.quota_project {
            Some(project) => builder.header(QUOTA_PROJECT_HEADER, project),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = self.authorize(builder).send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout
            } else {
                ApiError::Request(e)
            }
        })?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Performs a GET request and parses the JSON body.
    #[instrument(skip(self, query), fields(url = %url))]
    pub async fn get_json<T, Q>(&self, url: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        debug!("GET request");
        let response = self.send(self.inner.get(url).query(query)).await?;
        handle_response(response).await
    }

    /// Performs a POST request with a JSON body and parses the JSON reply.
    #[instrument(skip(self, body), fields(url = %url))]
    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("POST request with JSON");
        let response = self.send(self.inner.post(url).json(body)).await?;
        handle_response(response).await
    }

    /// Performs a POST request with form data and parses the JSON reply.
    #[instrument(skip(self, form), fields(url = %url))]
    pub async fn post_form<F, T>(&self, url: &str, form: &F) -> Result<T, ApiError>
    where
        F: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("POST request with form data");
        let response = self.send(self.inner.post(url).form(form)).await?;
        handle_response(response).await
    }

    /// Performs a DELETE request.
    ///
    /// Returns `false` when the resource did not exist.
    #[instrument(skip(self, query), fields(url = %url))]
    pub async fn delete<Q>(&self, url: &str, query: &Q) -> Result<bool, ApiError>
    where
        Q: Serialize + ?Sized,
    {
        debug!("DELETE request");
        let response = self.send(self.inner.delete(url).query(query)).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }

    /// Returns the inner reqwest client for advanced operations.
    pub fn inner(&self) -> &Client {
        &self.inner
    }
}

// ============================================================================
// Response Handling
// ============================================================================

/// Parses a successful JSON body or classifies the failure status.
pub async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
        serde_json::from_str(&text).map_err(|e| {
            warn!(error = %e, "Failed to parse response");
            ApiError::InvalidResponse(e.to_string())
        })
    } else {
        Err(status_error(status, &text))
    }
}

/// Maps a non-success status and body to an [`ApiError`].
pub fn status_error(status: StatusCode, body: &str) -> ApiError {
    let message = error_message(body);
    match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
        StatusCode::FORBIDDEN => ApiError::PermissionDenied(message),
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        StatusCode::CONFLICT => ApiError::Conflict(message),
        _ => ApiError::Status {
            status: status.as_u16(),
            message,
        },
    }
}

/// Extracts `error.message` from a Google error body, or returns the body.
fn error_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct Envelope {
        error: ErrorBody,
    }
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: String,
    }

    serde_json::from_str::<Envelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Returns true if a response body carries the `invalid_grant` OAuth error.
pub(crate) fn is_invalid_grant(body: &str) -> bool {
    body.contains("invalid_grant")
}

// ============================================================================
// Tests
// ============================================================================
