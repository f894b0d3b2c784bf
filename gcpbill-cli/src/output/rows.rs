//! Row views over provider records.

use gcpbill_core::{BillingAccount, ProjectBillingInfo};
use serde::Serialize;

use super::Tabular;

/// A billing account listing row.
#[derive(Debug, Clone, Serialize)]
pub struct AccountRow {
    /// Bare account id.
    pub id: String,
    /// Resource name.
    pub name: String,
    /// Display name.
    pub display_name: String,
    /// Whether the account is open.
    pub open: bool,
    /// Currency code or `N/A`.
    pub currency: String,
}

impl From<&BillingAccount> for AccountRow {
    fn from(account: &BillingAccount) -> Self {
        Self {
            id: account.id.clone(),
            name: account.name.clone(),
            display_name: account.display_name.clone(),
            open: account.open,
            currency: account.currency_or_na().to_string(),
        }
    }
}

impl Tabular for AccountRow {
    fn headers(&self) -> Vec<&'static str> {
        vec!["id", "name", "display_name", "open", "currency"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.display_name.clone(),
            self.open.to_string(),
            self.currency.clone(),
        ]
    }
}

/// A project billing listing row.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectRow {
    /// Project id.
    pub project_id: String,
    /// Linked billing account id.
    pub billing_account: Option<String>,
    /// Whether billing is enabled.
    pub billing_enabled: bool,
}

impl From<&ProjectBillingInfo> for ProjectRow {
    fn from(info: &ProjectBillingInfo) -> Self {
        Self {
            project_id: info.project_id.clone(),
            billing_account: info.billing_account.clone(),
            billing_enabled: info.billing_enabled,
        }
    }
}

impl Tabular for ProjectRow {
    fn headers(&self) -> Vec<&'static str> {
        vec!["project_id", "billing_account", "billing_enabled"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.project_id.clone(),
            self.billing_account.clone().unwrap_or_else(|| "None".to_string()),
            self.billing_enabled.to_string(),
        ]
    }
}
