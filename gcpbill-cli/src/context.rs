//! Logging, settings and authentication shared by the binaries.

use std::path::PathBuf;

use anyhow::{Context, Result};
use gcpbill_core::BillingAccountId;
use gcpbill_fetch::{AuthError, BigQueryClient, BillingClient, CredentialResolver, Credentials};
use gcpbill_report::remedy::authentication_help;
use gcpbill_store::{Settings, SettingsStore};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// ============================================================================
// Logging
// ============================================================================

/// Installs the stderr subscriber. `RUST_LOG` overrides the level chosen by
/// `debug`.
pub fn setup_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("gcpbill=debug")
        } else {
            EnvFilter::new("gcpbill=warn")
        }
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Context
// ============================================================================

/// Settings loaded for one run.
pub struct AppContext {
    /// Backing store, used to persist changes.
    pub store: SettingsStore,
    /// Snapshot taken at load time.
    pub settings: Settings,
}

impl AppContext {
    /// Loads settings from `--config`, `GCPBILL_CONFIG` or the default path.
    pub async fn load(config: Option<PathBuf>) -> Result<Self> {
        let path = SettingsStore::resolve_path(config);
        let store = SettingsStore::load(path.clone())
            .await
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
        let settings = store.get().await;
        debug!(path = %path.display(), "Settings loaded");
        Ok(Self { store, settings })
    }

    /// Resolves credentials. On failure prints the authentication help and
    /// returns the error.
    pub async fn authenticate(&self, resolver: CredentialResolver) -> Result<Credentials, AuthError> {
        match resolver.resolve().await {
            Ok(credentials) => {
                info!(source = %credentials.source(), "Authenticated");
                Ok(credentials)
            }
            Err(e) => {
                print_auth_failure(&e);
                Err(e)
            }
        }
    }

    /// Billing account from the flag, falling back to the settings default.
    ///
    /// An invalid settings value is logged and ignored.
    pub fn billing_account(&self, flag: Option<BillingAccountId>) -> Option<BillingAccountId> {
        flag.or_else(|| {
            let raw = self.settings.default_billing_account.as_deref()?;
            match BillingAccountId::parse(raw) {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(error = %e, "Ignoring default_billing_account from settings");
                    None
                }
            }
        })
    }

    /// Project that hosts BigQuery work: explicit, then settings, then the
    /// credentials' project.
    pub fn warehouse_project(
        &self,
        explicit: Option<&str>,
        credentials: &Credentials,
    ) -> Option<String> {
        explicit
            .or(self.settings.default_project.as_deref())
            .or(credentials.project_id())
            .map(str::to_string)
    }

    /// Cloud Billing client.
    pub fn billing_client(credentials: &Credentials) -> Result<BillingClient> {
        Ok(BillingClient::new(credentials.http_client()?))
    }

    /// BigQuery client bound to `project_id`.
    pub fn warehouse_client(credentials: &Credentials, project_id: &str) -> Result<BigQueryClient> {
        Ok(BigQueryClient::new(credentials.http_client()?, project_id))
    }
}

/// Prints the authentication remediation to stderr.
pub fn print_auth_help(details: &str) {
    for line in authentication_help(details) {
        eprintln!("{line}");
    }
}

/// Prints the remediation for a credential resolution failure.
pub fn print_auth_failure(error: &AuthError) {
    print_auth_help(&error.to_string());
}

/// Message printed when no BigQuery project can be determined.
pub const NO_PROJECT_MESSAGE: &str = "Error: No project specified. Use --project, set default_project in settings, or set GOOGLE_CLOUD_PROJECT";

#[cfg(test)]
mod tests {
    use super::*;
    use gcpbill_fetch::CredentialSource;

    fn context(settings: Settings) -> AppContext {
        AppContext {
            store: SettingsStore::new(PathBuf::from("/nonexistent/settings.json")),
            settings,
        }
    }

    #[test]
    fn test_billing_account_prefers_flag() {
        let ctx = context(Settings {
            default_billing_account: Some("111111-222222-333333".to_string()),
            ..Settings::default()
        });
        let flag = BillingAccountId::parse("01AB23-CD4567").ok();
        assert_eq!(ctx.billing_account(flag).unwrap().as_str(), "01AB23-CD4567");
        assert_eq!(ctx.billing_account(None).unwrap().as_str(), "111111-222222-333333");
    }

    #[test]
    fn test_invalid_default_account_is_ignored() {
        let ctx = context(Settings {
            default_billing_account: Some("not an account".to_string()),
            ..Settings::default()
        });
        assert!(ctx.billing_account(None).is_none());
    }

    #[test]
    fn test_warehouse_project_order() {
        let credentials = Credentials::from_token("token", CredentialSource::GcloudUser);
        let ctx = context(Settings::default());
        assert_eq!(ctx.warehouse_project(None, &credentials), None);
        assert_eq!(
            ctx.warehouse_project(Some("explicit"), &credentials).as_deref(),
            Some("explicit")
        );

        let ctx = context(Settings {
            default_project: Some("from-settings".to_string()),
            ..Settings::default()
        });
        assert_eq!(
            ctx.warehouse_project(None, &credentials).as_deref(),
            Some("from-settings")
        );
    }
}
