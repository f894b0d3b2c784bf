//! Cloud Billing REST client.

use gcpbill_core::{
    BILLING_ACCOUNT_PREFIX, BillingAccount, BillingApi, ProjectBillingInfo, ProviderError,
};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::ApiError;
use crate::host::http::HttpClient;

/// Cloud Billing API base URL.
pub const BILLING_API_BASE: &str = "https://cloudbilling.googleapis.com/v1";

const PAGE_SIZE: &str = "100";

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListAccountsResponse {
    #[serde(default)]
    billing_accounts: Vec<AccountResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResource {
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    open: bool,
    currency_code: Option<String>,
    master_billing_account: Option<String>,
}

impl From<AccountResource> for BillingAccount {
    fn from(r: AccountResource) -> Self {
        let mut account = BillingAccount::from_resource_name(r.name, r.display_name);
        account.open = r.open;
        account.currency = r.currency_code.filter(|c| !c.is_empty());
        account.master_billing_account = r.master_billing_account.filter(|m| !m.is_empty());
        account
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListProjectsResponse {
    #[serde(default)]
    project_billing_info: Vec<ProjectResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResource {
    project_id: String,
    billing_account_name: Option<String>,
    #[serde(default)]
    billing_enabled: bool,
}

impl From<ProjectResource> for ProjectBillingInfo {
    fn from(r: ProjectResource) -> Self {
        Self {
            project_id: r.project_id,
            billing_account: r
                .billing_account_name
                .filter(|n| !n.is_empty())
                .map(|n| n.trim_start_matches(BILLING_ACCOUNT_PREFIX).to_string()),
            billing_enabled: r.billing_enabled,
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// Client for `cloudbilling.googleapis.com`.
#[derive(Debug, Clone)]
pub struct BillingClient {
    http: HttpClient,
    base_url: String,
}

impl BillingClient {
    /// Creates a client against the public endpoint.
    pub fn new(http: HttpClient) -> Self {
        Self::with_base_url(http, BILLING_API_BASE)
    }

    /// Creates a client against a custom base URL.
    pub fn with_base_url(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Lists billing accounts, following pagination.
    #[instrument(skip(self))]
    pub async fn billing_accounts(&self) -> Result<Vec<BillingAccount>, ApiError> {
        let url = format!("{}/billingAccounts", self.base_url);
        let mut accounts = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", PAGE_SIZE.to_string())];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let page: ListAccountsResponse = self.http.get_json(&url, &query).await?;
            accounts.extend(page.billing_accounts.into_iter().map(BillingAccount::from));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = accounts.len(), "Listed billing accounts");
        Ok(accounts)
    }

    /// Lists projects linked to a billing account, following pagination.
    #[instrument(skip(self))]
    pub async fn project_billing_info(
        &self,
        account_name: &str,
    ) -> Result<Vec<ProjectBillingInfo>, ApiError> {
        let name = if account_name.starts_with(BILLING_ACCOUNT_PREFIX) {
            account_name.to_string()
        } else {
            format!("{BILLING_ACCOUNT_PREFIX}{account_name}")
        };
        let url = format!("{}/{name}/projects", self.base_url);
        let mut projects = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", PAGE_SIZE.to_string())];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let page: ListProjectsResponse = self.http.get_json(&url, &query).await?;
            projects.extend(
                page.project_billing_info
                    .into_iter()
                    .map(ProjectBillingInfo::from),
            );

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = projects.len(), "Listed project billing info");
        Ok(projects)
    }
}

impl BillingApi for BillingClient {
    async fn list_billing_accounts(&self) -> Result<Vec<BillingAccount>, ProviderError> {
        Ok(self.billing_accounts().await?)
    }

    async fn list_project_billing_info(
        &self,
        account_name: &str,
    ) -> Result<Vec<ProjectBillingInfo>, ProviderError> {
        Ok(self.project_billing_info(account_name).await?)
    }
}
