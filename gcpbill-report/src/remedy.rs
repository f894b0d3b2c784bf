//! Remediation text shared by the report flows and the binaries.

use gcpbill_core::BillingAccountId;

/// Command that refreshes application default credentials.
pub const REAUTH_COMMAND: &str = "gcloud auth application-default login";

/// Console path for manual export configuration.
pub const CONSOLE_EXPORT_PATH: &str = "GCP Console → Billing → Billing export";

/// Lines explaining how to authenticate.
pub fn authentication_help(details: &str) -> Vec<String> {
    vec![
        "Error: Not authenticated with Google Cloud.".to_string(),
        String::new(),
        format!("Details: {details}"),
        String::new(),
        "Please authenticate using one of these methods:".to_string(),
        format!("  1. {REAUTH_COMMAND}"),
        "  2. gcloud auth login".to_string(),
        "  3. Set GOOGLE_APPLICATION_CREDENTIALS environment variable".to_string(),
        String::new(),
        "If you see 'Reauthentication is needed', run:".to_string(),
        format!("  {REAUTH_COMMAND}"),
    ]
}

/// Command that enables the BigQuery API on a project.
pub fn enable_api_command(project_id: &str) -> String {
    format!("gcloud services enable bigquery.googleapis.com --project={project_id}")
}

/// Command that sets up billing export for an account.
pub fn setup_command(account: &BillingAccountId, project_id: Option<&str>) -> String {
    format!(
        "gcpbill-setup --setup --billing-account {account} --project {}",
        project_id.unwrap_or("YOUR_PROJECT")
    )
}

/// Command that reports costs for an account.
pub fn costs_command(account: &BillingAccountId) -> String {
    format!("gcpbill --costs --billing-account {account}")
}

/// `bq` command that deletes a dataset and its tables.
pub fn delete_dataset_command(project_id: &str, dataset_id: &str) -> String {
    format!("bq rm -r -f -d {project_id}:{dataset_id}")
}

/// `bq` command that lists a dataset's tables.
pub fn list_tables_command(project_id: &str, dataset_id: &str) -> String {
    format!("bq ls {project_id}:{dataset_id}")
}

/// Console URL for a dataset.
pub fn dataset_console_url(project_id: &str, dataset_id: &str) -> String {
    format!(
        "https://console.cloud.google.com/bigquery?project={project_id}&ws=!1m4!1m3!3m2!1s{project_id}!2s{dataset_id}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands() {
        let account = BillingAccountId::parse("01ab23-cd4567").unwrap();
        assert_eq!(
            setup_command(&account, None),
            "gcpbill-setup --setup --billing-account 01AB23-CD4567 --project YOUR_PROJECT"
        );
        assert_eq!(
            enable_api_command("proj-1"),
            "gcloud services enable bigquery.googleapis.com --project=proj-1"
        );
        assert_eq!(
            delete_dataset_command("proj-1", "billing_export"),
            "bq rm -r -f -d proj-1:billing_export"
        );
    }

    #[test]
    fn test_authentication_help_mentions_reauth() {
        let lines = authentication_help("token expired");
        assert!(lines.iter().any(|l| l.contains("token expired")));
        assert_eq!(lines.iter().filter(|l| l.contains(REAUTH_COMMAND)).count(), 2);
    }
}
