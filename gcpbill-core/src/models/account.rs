//! Billing account types.
//!
//! - [`BillingAccountId`] - Normalized billing account identifier
//! - [`BillingAccount`] - Account as returned by the Cloud Billing API
//! - [`ProjectBillingInfo`] - Project linkage to a billing account

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Resource-name prefix used by the Cloud Billing API.
pub const BILLING_ACCOUNT_PREFIX: &str = "billingAccounts/";

static ACCOUNT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+(?:[-_][A-Za-z0-9]+)*$").expect("valid regex"));

// ============================================================================
// Billing Account Id
// ============================================================================

/// A billing account identifier such as `01AB23-CD4567-EF8901`.
///
/// Accepts the bare id, the underscore form used in export table names, or
/// the `billingAccounts/<id>` resource name. The canonical form uses dashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BillingAccountId(String);

impl BillingAccountId {
    /// Parses and canonicalizes an identifier.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        let bare = trimmed.strip_prefix(BILLING_ACCOUNT_PREFIX).unwrap_or(trimmed);

        if !ACCOUNT_ID_RE.is_match(bare) {
            return Err(CoreError::InvalidBillingAccount(raw.to_string()));
        }

        Ok(Self(bare.replace('_', "-").to_uppercase()))
    }

    /// The dashed form, as shown in the console.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The underscore form used in export table names.
    pub fn normalized(&self) -> String {
        self.0.replace('-', "_")
    }

    /// The `billingAccounts/<id>` resource name.
    pub fn resource_name(&self) -> String {
        format!("{BILLING_ACCOUNT_PREFIX}{}", self.0)
    }

    /// Console page for this billing account.
    pub fn console_url(&self) -> String {
        format!("https://console.cloud.google.com/billing/{}", self.0)
    }

    /// Console page for the billing export settings.
    pub fn export_console_url(&self) -> String {
        format!("{}/export", self.console_url())
    }
}

impl fmt::Display for BillingAccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BillingAccountId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BillingAccountId> for String {
    fn from(value: BillingAccountId) -> Self {
        value.0
    }
}

impl std::str::FromStr for BillingAccountId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ============================================================================
// Billing Account
// ============================================================================

/// A billing account reachable by the current credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingAccount {
    /// Bare identifier (`01AB23-CD4567-EF8901`).
    pub id: String,
    /// Resource name (`billingAccounts/01AB23-CD4567-EF8901`).
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Whether the account is open.
    pub open: bool,
    /// Currency code, when the API reports one.
    pub currency: Option<String>,
    /// Parent account for subaccounts.
    pub master_billing_account: Option<String>,
}

impl BillingAccount {
    /// Builds an account from its resource name, deriving the id.
    pub fn from_resource_name(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        let name = name.into();
        let id = name.rsplit('/').next().unwrap_or(&name).to_string();
        Self {
            id,
            name,
            display_name: display_name.into(),
            open: true,
            currency: None,
            master_billing_account: None,
        }
    }

    /// Currency code or `N/A`.
    pub fn currency_or_na(&self) -> &str {
        self.currency.as_deref().unwrap_or("N/A")
    }
}

// ============================================================================
// Project Billing Info
// ============================================================================

/// Billing linkage of a single project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectBillingInfo {
    /// Project id.
    pub project_id: String,
    /// Bare billing account id, if linked.
    pub billing_account: Option<String>,
    /// Whether billing is enabled.
    pub billing_enabled: bool,
}
