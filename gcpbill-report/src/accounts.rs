//! Billing account and project listing.

use gcpbill_core::{BillingAccount, BillingApi, ErrorKind, ProjectBillingInfo, ProviderError};
use tracing::{debug, instrument, warn};

use crate::error::ReportError;
use crate::remedy::REAUTH_COMMAND;

/// Lists billing accounts, keeping those whose resource name contains `filter`.
///
/// Any failure is returned to the caller; the account list is the first call
/// every flow makes, so there is nothing to degrade to.
#[instrument(skip(api))]
pub async fn list_accounts<B: BillingApi>(
    api: &B,
    filter: Option<&str>,
) -> Result<Vec<BillingAccount>, ReportError> {
    let mut accounts = api.list_billing_accounts().await?;

    if let Some(filter) = filter.filter(|f| !f.is_empty()) {
        accounts.retain(|a| a.name.contains(filter));
    }

    debug!(count = accounts.len(), "Billing accounts listed");
    Ok(accounts)
}

/// Hints printed when listing billing accounts fails.
pub fn account_list_hints(error: &ProviderError) -> Vec<String> {
    if error.kind() == ErrorKind::Authentication {
        return vec![
            "Error: Authentication expired or invalid.".to_string(),
            String::new(),
            "Please re-authenticate:".to_string(),
            format!("  {REAUTH_COMMAND}"),
        ];
    }

    vec![
        "Common issues:".to_string(),
        "  - Insufficient permissions (need billing.accounts.list)".to_string(),
        "  - No billing accounts associated with your account".to_string(),
        format!("  - Authentication expired (run: {REAUTH_COMMAND})"),
    ]
}

// ============================================================================
// Projects
// ============================================================================

/// A listing failure for one billing account.
#[derive(Debug, Clone)]
pub struct ListingFailure {
    /// Account being listed, `None` for the account list itself.
    pub account: Option<String>,
    /// The failure.
    pub error: ProviderError,
}

/// Projects linked to one or more billing accounts.
#[derive(Debug, Clone, Default)]
pub struct ProjectListing {
    /// Projects found.
    pub projects: Vec<ProjectBillingInfo>,
    /// Failures encountered along the way.
    pub failures: Vec<ListingFailure>,
}

impl ProjectListing {
    /// Returns true if any call failed.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Lists projects for `account`, or for every visible account when `None`.
///
/// Failures are collected rather than returned. Projects listed under an
/// enumerated account are attributed to that account.
#[instrument(skip(api))]
pub async fn list_projects<B: BillingApi>(api: &B, account: Option<&str>) -> ProjectListing {
    let mut listing = ProjectListing::default();

    if let Some(account) = account {
        match api.list_project_billing_info(account).await {
            Ok(projects) => listing.projects = projects,
            Err(error) => {
                warn!(account, error = %error, "Failed to list projects");
                listing.failures.push(ListingFailure {
                    account: Some(account.to_string()),
                    error,
                });
            }
        }
        return listing;
    }

    let accounts = match api.list_billing_accounts().await {
        Ok(accounts) => accounts,
        Err(error) => {
            warn!(error = %error, "Failed to list billing accounts");
            listing.failures.push(ListingFailure { account: None, error });
            return listing;
        }
    };

    for account in &accounts {
        match api.list_project_billing_info(&account.name).await {
            Ok(projects) => listing.projects.extend(projects.into_iter().map(|mut p| {
                p.billing_account = Some(account.id.clone());
                p
            })),
            Err(error) => {
                warn!(account = %account.id, error = %error, "Failed to list projects");
                listing.failures.push(ListingFailure {
                    account: Some(account.id.clone()),
                    error,
                });
            }
        }
    }

    debug!(
        count = listing.projects.len(),
        failures = listing.failures.len(),
        "Projects listed"
    );
    listing
}
