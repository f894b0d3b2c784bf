//! End-to-end flow tests against an in-memory cloud.
//!
//! `StubCloud` implements both provider traits from canned data and records
//! the calls it receives, so the tests can check ordering as well as results.

mod stub {
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::{DateTime, Utc};
    use gcpbill_core::{
        BillingAccount, BillingApi, DatasetCreation, DatasetInfo, ProjectBillingInfo,
        ProviderError, QueryRequest, QueryRows, TableInfo, TableRef, WarehouseApi,
    };

    use crate::setup::SetupConsole;

    #[derive(Default)]
    pub struct StubCloud {
        pub project: String,
        pub accounts: Vec<BillingAccount>,
        pub accounts_error: Option<ProviderError>,
        pub projects: Vec<(String, Result<Vec<ProjectBillingInfo>, ProviderError>)>,
        pub datasets: Mutex<Vec<(String, Vec<TableInfo>)>>,
        pub datasets_error: Option<ProviderError>,
        pub probe_error: Option<ProviderError>,
        pub get_table_error: Option<ProviderError>,
        pub cost_rows: QueryRows,
        pub coverage_rows: QueryRows,
        pub query_error: Option<ProviderError>,
        pub delete_error: Option<ProviderError>,
        pub calls: Mutex<Vec<String>>,
        pub queries: Mutex<Vec<QueryRequest>>,
    }

    impl StubCloud {
        pub fn new(project: &str) -> Self {
            Self {
                project: project.to_string(),
                ..Self::default()
            }
        }

        pub fn account(mut self, id: &str, open: bool) -> Self {
            let mut account =
                BillingAccount::from_resource_name(format!("billingAccounts/{id}"), id);
            account.open = open;
            self.accounts.push(account);
            self
        }

        pub fn dataset(self, dataset_id: &str, tables: Vec<TableInfo>) -> Self {
            self.datasets
                .lock()
                .unwrap()
                .push((dataset_id.to_string(), tables));
            self
        }

        pub fn table(&self, dataset_id: &str, table_id: &str) -> TableInfo {
            TableInfo::new(TableRef::new(&self.project, dataset_id, table_id).unwrap())
        }

        pub fn table_with(
            &self,
            dataset_id: &str,
            table_id: &str,
            rows: u64,
            created_at: DateTime<Utc>,
        ) -> TableInfo {
            let mut info = self.table(dataset_id, table_id);
            info.num_rows = Some(rows);
            info.created_at = Some(created_at);
            info
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn log(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl BillingApi for StubCloud {
        async fn list_billing_accounts(&self) -> Result<Vec<BillingAccount>, ProviderError> {
            self.log("list_billing_accounts".into());
            match &self.accounts_error {
                Some(e) => Err(e.clone()),
                None => Ok(self.accounts.clone()),
            }
        }

        async fn list_project_billing_info(
            &self,
            account_name: &str,
        ) -> Result<Vec<ProjectBillingInfo>, ProviderError> {
            self.log(format!("list_projects:{account_name}"));
            self.projects
                .iter()
                .find(|(name, _)| name == account_name)
                .map_or_else(|| Ok(Vec::new()), |(_, result)| result.clone())
        }
    }

    impl WarehouseApi for StubCloud {
        fn project_id(&self) -> &str {
            &self.project
        }

        async fn list_datasets(
            &self,
            max_results: Option<u32>,
        ) -> Result<Vec<DatasetInfo>, ProviderError> {
            self.log(format!("list_datasets:{max_results:?}"));
            if let (Some(_), Some(e)) = (max_results, &self.probe_error) {
                return Err(e.clone());
            }
            if let Some(e) = &self.datasets_error {
                return Err(e.clone());
            }
            let datasets = self.datasets.lock().unwrap();
            let limit = max_results.map_or(usize::MAX, |m| m as usize);
            Ok(datasets
                .iter()
                .take(limit)
                .map(|(id, _)| DatasetInfo::new(&self.project, id))
                .collect())
        }

        async fn list_tables(&self, dataset_id: &str) -> Result<Vec<TableInfo>, ProviderError> {
            self.log(format!("list_tables:{dataset_id}"));
            let datasets = self.datasets.lock().unwrap();
            datasets
                .iter()
                .find(|(id, _)| id == dataset_id)
                .map(|(_, tables)| {
                    tables
                        .iter()
                        .map(|t| TableInfo::new(t.reference.clone()))
                        .collect()
                })
                .ok_or_else(|| ProviderError::NotFound(dataset_id.to_string()))
        }

        async fn get_table(&self, table: &TableRef) -> Result<TableInfo, ProviderError> {
            self.log(format!("get_table:{}", table.table_id));
            if let Some(e) = &self.get_table_error {
                return Err(e.clone());
            }
            let datasets = self.datasets.lock().unwrap();
            datasets
                .iter()
                .flat_map(|(_, tables)| tables.iter())
                .find(|t| &t.reference == table)
                .cloned()
                .ok_or_else(|| ProviderError::NotFound(table.to_string()))
        }

        async fn run_query(&self, request: &QueryRequest) -> Result<QueryRows, ProviderError> {
            self.log("run_query".into());
            self.queries.lock().unwrap().push(request.clone());
            if let Some(e) = &self.query_error {
                return Err(e.clone());
            }
            if request.sql.contains("MIN(DATE(usage_start_time))") {
                Ok(self.coverage_rows.clone())
            } else {
                Ok(self.cost_rows.clone())
            }
        }

        async fn create_dataset(
            &self,
            dataset_id: &str,
            location: &str,
        ) -> Result<DatasetCreation, ProviderError> {
            self.log(format!("create_dataset:{dataset_id}:{location}"));
            let mut datasets = self.datasets.lock().unwrap();
            if datasets.iter().any(|(id, _)| id == dataset_id) {
                return Ok(DatasetCreation::AlreadyExists);
            }
            datasets.push((dataset_id.to_string(), Vec::new()));
            Ok(DatasetCreation::Created)
        }

        async fn delete_dataset(
            &self,
            dataset_id: &str,
            delete_contents: bool,
        ) -> Result<bool, ProviderError> {
            self.log(format!("delete_dataset:{dataset_id}:{delete_contents}"));
            if let Some(e) = &self.delete_error {
                return Err(e.clone());
            }
            let mut datasets = self.datasets.lock().unwrap();
            let before = datasets.len();
            datasets.retain(|(id, _)| id != dataset_id);
            Ok(datasets.len() < before)
        }
    }

    /// Console that records output and answers prompts from a script.
    #[derive(Default)]
    pub struct ScriptedConsole {
        pub interactive: bool,
        pub browser_opens: bool,
        pub lines: Mutex<Vec<String>>,
        pub opened: Mutex<Vec<String>>,
        pub pauses: Mutex<Vec<Duration>>,
    }

    impl ScriptedConsole {
        pub fn output(&self) -> String {
            self.lines.lock().unwrap().join("\n")
        }
    }

    impl SetupConsole for ScriptedConsole {
        fn say(&self, line: &str) {
            self.lines.lock().unwrap().push(line.to_string());
        }

        async fn open_url(&self, url: &str) -> bool {
            self.opened.lock().unwrap().push(url.to_string());
            self.browser_opens
        }

        async fn wait_for_confirmation(&self, _prompt: &str) -> bool {
            self.interactive
        }

        async fn pause(&self, duration: Duration) {
            self.pauses.lock().unwrap().push(duration);
        }
    }
}

// ============================================================================
// Locator
// ============================================================================

mod locator_flow_tests {
    use gcpbill_core::{BillingAccountId, ProviderError};

    use super::stub::StubCloud;
    use crate::locator::ExportLocator;

    fn account() -> BillingAccountId {
        BillingAccountId::parse("01AB23-CD4567").unwrap()
    }

    #[tokio::test]
    async fn test_detects_export_table_path() {
        let cloud = StubCloud::new("proj-1");
        let tables = vec![
            cloud.table("billing_export", "some_other_table"),
            cloud.table("billing_export", "gcp_billing_export_v1_01AB23_CD4567"),
        ];
        let cloud = cloud.dataset("billing_export", tables);

        let locator = ExportLocator::new(&cloud, vec!["billing_export".into()]);
        let found = locator.locate(&account()).await.unwrap();
        assert_eq!(
            found.to_string(),
            "proj-1.billing_export.gcp_billing_export_v1_01AB23_CD4567"
        );
    }

    #[tokio::test]
    async fn test_absent_table_is_not_found() {
        let cloud = StubCloud::new("proj-1");
        let tables = vec![cloud.table("billing", "gcp_billing_export_v1_99ZZ99_ZZ9999")];
        let cloud = cloud.dataset("billing", tables);

        let locator = ExportLocator::new(&cloud, vec!["billing".into()]);
        assert!(locator.locate(&account()).await.is_none());
    }

    #[tokio::test]
    async fn test_preferred_datasets_searched_first() {
        let cloud = StubCloud::new("proj-1");
        let early = vec![cloud.table("analytics", "gcp_billing_export_v1_01AB23_CD4567_copy")];
        let preferred = vec![cloud.table("billing_data", "gcp_billing_export_v1_01AB23_CD4567")];
        let cloud = cloud
            .dataset("analytics", early)
            .dataset("billing_data", preferred);

        let locator = ExportLocator::new(&cloud, vec!["billing_export".into(), "billing_data".into()]);
        let found = locator.locate(&account()).await.unwrap();
        assert_eq!(found.dataset_id, "billing_data");

        let calls = cloud.calls();
        assert_eq!(calls, vec!["list_datasets:None", "list_tables:billing_data"]);
    }

    #[tokio::test]
    async fn test_falls_back_to_full_scan() {
        let cloud = StubCloud::new("proj-1");
        let tables = vec![cloud.table("finance", "gcp_billing_export_resource_v1_01AB23_CD4567")];
        let cloud = cloud.dataset("logs", Vec::new()).dataset("finance", tables);

        let locator = ExportLocator::new(&cloud, vec!["billing_export".into()]);
        let found = locator.locate(&account()).await.unwrap();
        assert_eq!(found.table_id, "gcp_billing_export_resource_v1_01AB23_CD4567");
    }

    #[tokio::test]
    async fn test_provider_error_is_not_found() {
        let mut cloud = StubCloud::new("proj-1");
        cloud.datasets_error = Some(ProviderError::PermissionDenied("bigquery.datasets.list".into()));

        let locator = ExportLocator::new(&cloud, Vec::new());
        assert!(locator.locate(&account()).await.is_none());
    }
}

// ============================================================================
// Cost Report
// ============================================================================

mod cost_flow_tests {
    use chrono::{Duration, NaiveDate, Utc};
    use gcpbill_core::{
        BillingAccountId, DateRange, ExportHealth, GroupBy, ModelPattern, ProviderError,
        QueryRows,
    };

    use super::stub::StubCloud;
    use crate::costs::{CostOutcome, CostReporter, CostRequest};

    const TABLE: &str = "gcp_billing_export_v1_01AB23_CD4567";

    fn request(project: Option<&str>, group_by: GroupBy) -> CostRequest {
        CostRequest {
            account: BillingAccountId::parse("01AB23-CD4567").unwrap(),
            range: DateRange::new(
                NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            )
            .unwrap(),
            project: project.map(str::to_string),
            group_by,
        }
    }

    fn cloud_with_table(rows: u64, age_hours: i64) -> StubCloud {
        let cloud = StubCloud::new("proj-1");
        let table = cloud.table_with(
            "billing_export",
            TABLE,
            rows,
            Utc::now() - Duration::hours(age_hours),
        );
        cloud.dataset("billing_export", vec![table])
    }

    #[tokio::test]
    async fn test_young_empty_table_is_waiting() {
        let cloud = cloud_with_table(0, 3);
        let reporter = CostReporter::new(&cloud, vec!["billing_export".into()]);
        let report = reporter.run(request(None, GroupBy::Service), Utc::now()).await.unwrap();

        let CostOutcome::NoData(health) = &report.outcome else {
            panic!("expected NoData, got {:?}", report.outcome);
        };
        assert_eq!(health.health.label(), "waiting");
        assert!(cloud.queries.lock().unwrap().is_empty());
        assert!(report.notices().iter().any(|n| n.contains("Data should be available")));
    }

    #[tokio::test]
    async fn test_old_empty_table_is_misconfigured() {
        let cloud = cloud_with_table(0, 30);
        let reporter = CostReporter::new(&cloud, vec!["billing_export".into()]);
        let report = reporter.run(request(None, GroupBy::Service), Utc::now()).await.unwrap();

        let CostOutcome::NoData(health) = &report.outcome else {
            panic!("expected NoData, got {:?}", report.outcome);
        };
        assert!(matches!(health.health, ExportHealth::Misconfigured { .. }));
        assert!(report.rows().is_empty());
    }

    #[tokio::test]
    async fn test_missing_row_count_still_queries() {
        let mut cloud = StubCloud::new("proj-1");
        let mut table = cloud.table("billing_export", TABLE);
        table.created_at = Some(Utc::now() - Duration::days(10));
        cloud = cloud.dataset("billing_export", vec![table]);
        let mut rows = QueryRows::with_columns(["category", "total_cost", "currency"]);
        rows.push_row(vec![Some("BigQuery".into()), Some("3.5".into()), Some("USD".into())]);
        cloud.cost_rows = rows;

        let reporter = CostReporter::new(&cloud, vec!["billing_export".into()]);
        let report = reporter.run(request(None, GroupBy::Service), Utc::now()).await.unwrap();

        assert!(!matches!(report.outcome, CostOutcome::NoData(_)));
        assert_eq!(report.rows().len(), 1);
        assert!(cloud.calls().contains(&"run_query".to_string()));
    }

    #[tokio::test]
    async fn test_rows_are_returned_with_project_filter() {
        let mut cloud = cloud_with_table(1200, 200);
        let mut rows = QueryRows::with_columns(["category", "total_cost", "currency"]);
        rows.push_row(vec![Some("Vertex AI".into()), Some("40.12".into()), Some("USD".into())]);
        rows.push_row(vec![Some("BigQuery".into()), Some("3.5".into()), Some("USD".into())]);
        cloud.cost_rows = rows;

        let reporter = CostReporter::new(&cloud, vec!["billing_export".into()])
            .with_model_patterns(vec![ModelPattern::new("gemini 2.5", "Gemini 2.5")]);
        let report = reporter
            .run(request(Some("proj-a"), GroupBy::Model), Utc::now())
            .await
            .unwrap();

        assert_eq!(report.rows().len(), 2);
        assert_eq!(report.rows()[0].category, "Vertex AI");

        let queries = cloud.queries.lock().unwrap();
        let cost_query = queries.last().unwrap();
        assert!(cost_query.sql.contains("@project_id"));
        assert!(cost_query.sql.contains("'%gemini 2.5%'"));
        assert_eq!(cost_query.parameters[0].value, "proj-a");
    }

    #[tokio::test]
    async fn test_missing_export_stops_before_queries() {
        let cloud = StubCloud::new("proj-1").dataset("billing_export", Vec::new());
        let reporter = CostReporter::new(&cloud, vec!["billing_export".into()]);
        let report = reporter.run(request(None, GroupBy::Service), Utc::now()).await.unwrap();

        assert_eq!(report.outcome, CostOutcome::ExportNotFound);
        assert!(cloud.calls().iter().all(|c| c != "run_query"));
    }

    #[tokio::test]
    async fn test_query_failure_is_reported_not_raised() {
        let mut cloud = cloud_with_table(10, 100);
        cloud.query_error = Some(ProviderError::Query("Syntax error".into()));

        let reporter = CostReporter::new(&cloud, Vec::new());
        let report = reporter.run(request(None, GroupBy::Day), Utc::now()).await.unwrap();

        assert!(matches!(report.outcome, CostOutcome::QueryFailed(_)));
        assert!(report.coverage.is_none());
        assert!(
            report
                .notices()
                .iter()
                .any(|n| n.starts_with("Error querying BigQuery: "))
        );
    }

    #[tokio::test]
    async fn test_auth_failure_during_query_is_raised() {
        let mut cloud = cloud_with_table(10, 100);
        cloud.query_error = Some(ProviderError::Authentication("token expired".into()));

        let reporter = CostReporter::new(&cloud, Vec::new());
        let err = reporter
            .run(request(None, GroupBy::Service), Utc::now())
            .await
            .unwrap_err();
        assert!(err.is_authentication());
    }

    #[tokio::test]
    async fn test_empty_result_reports_coverage() {
        let mut cloud = cloud_with_table(10, 100);
        let mut coverage = QueryRows::with_columns(["min_date", "max_date"]);
        coverage.push_row(vec![Some("2025-03-01".into()), Some("2025-03-31".into())]);
        cloud.coverage_rows = coverage;
        cloud.cost_rows = QueryRows::with_columns(["category", "total_cost", "currency"]);

        let reporter = CostReporter::new(&cloud, Vec::new());
        let report = reporter.run(request(None, GroupBy::Month), Utc::now()).await.unwrap();

        assert!(report.rows().is_empty());
        let coverage = report.coverage.unwrap();
        assert!(coverage.outside_range);
        let notes = report.notices();
        assert!(notes.contains(&"Available data range: 2025-03-01 to 2025-03-31".to_string()));
    }
}

// ============================================================================
// Accounts
// ============================================================================

mod account_flow_tests {
    use gcpbill_core::{ProjectBillingInfo, ProviderError};

    use super::stub::StubCloud;
    use crate::accounts::{list_accounts, list_projects};

    fn project(id: &str) -> ProjectBillingInfo {
        ProjectBillingInfo {
            project_id: id.to_string(),
            billing_account: None,
            billing_enabled: true,
        }
    }

    #[tokio::test]
    async fn test_filter_matches_resource_name() {
        let cloud = StubCloud::new("p")
            .account("01AB23-CD4567", true)
            .account("99ZZ99-ZZ9999", false);

        let all = list_accounts(&cloud, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let filtered = list_accounts(&cloud, Some("01AB23")).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "01AB23-CD4567");
    }

    #[tokio::test]
    async fn test_account_failure_is_returned() {
        let mut cloud = StubCloud::new("p");
        cloud.accounts_error = Some(ProviderError::PermissionDenied("billing.accounts.list".into()));
        assert!(list_accounts(&cloud, None).await.is_err());
    }

    #[tokio::test]
    async fn test_projects_across_accounts_collect_failures() {
        let mut cloud = StubCloud::new("p")
            .account("01AB23-CD4567", true)
            .account("99ZZ99-ZZ9999", true);
        cloud.projects = vec![
            (
                "billingAccounts/01AB23-CD4567".into(),
                Ok(vec![project("proj-a"), project("proj-b")]),
            ),
            (
                "billingAccounts/99ZZ99-ZZ9999".into(),
                Err(ProviderError::PermissionDenied("denied".into())),
            ),
        ];

        let listing = list_projects(&cloud, None).await;
        assert_eq!(listing.projects.len(), 2);
        assert!(
            listing
                .projects
                .iter()
                .all(|p| p.billing_account.as_deref() == Some("01AB23-CD4567"))
        );
        assert_eq!(listing.failures.len(), 1);
        assert_eq!(listing.failures[0].account.as_deref(), Some("99ZZ99-ZZ9999"));
    }

    #[tokio::test]
    async fn test_projects_for_one_account() {
        let mut cloud = StubCloud::new("p");
        cloud.projects = vec![("01AB23-CD4567".into(), Ok(vec![project("proj-a")]))];

        let listing = list_projects(&cloud, Some("01AB23-CD4567")).await;
        assert_eq!(listing.projects.len(), 1);
        assert!(!listing.has_failures());
        assert_eq!(cloud.calls(), vec!["list_projects:01AB23-CD4567"]);
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

mod diagnostics_flow_tests {
    use chrono::{Duration, Utc};
    use gcpbill_core::{BillingAccountId, ExportHealth, ProviderError};

    use super::stub::StubCloud;
    use crate::diagnostics::{DiagnosticStep, Diagnostics, Recommendation, StepStatus};

    #[tokio::test]
    async fn test_full_run_with_working_export() {
        let cloud = StubCloud::new("proj-1").account("01AB23-CD4567", true);
        let table = cloud.table_with(
            "billing_export",
            "gcp_billing_export_v1_01AB23_CD4567",
            5000,
            Utc::now() - Duration::days(10),
        );
        let cloud = cloud.dataset("billing_export", vec![table]);

        let report = Diagnostics::new(&cloud, &cloud, "test")
            .with_preferred_datasets(vec!["billing_export".into()])
            .run(Utc::now())
            .await;

        assert!(!report.is_aborted());
        assert_eq!(report.steps.len(), DiagnosticStep::all().len());
        assert!(report.steps.iter().all(|s| s.status == StepStatus::Passed));
        assert_eq!(report.datasets[0].tables[0].num_rows, Some(5000));
        assert!(report.exports[0].table.as_ref().unwrap().health.is_working());
        assert!(report.recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_metadata_is_not_classified_empty() {
        let cloud = StubCloud::new("proj-1").account("01AB23-CD4567", true);
        let table = cloud.table_with(
            "billing_export",
            "gcp_billing_export_v1_01AB23_CD4567",
            5000,
            Utc::now() - Duration::days(10),
        );
        let mut cloud = cloud.dataset("billing_export", vec![table]);
        cloud.get_table_error = Some(ProviderError::PermissionDenied("bigquery.tables.get".into()));

        let report = Diagnostics::new(&cloud, &cloud, "test")
            .with_preferred_datasets(vec!["billing_export".into()])
            .run(Utc::now())
            .await;

        assert!(!report.is_aborted());
        let health = report.exports[0].table.as_ref().unwrap();
        assert_eq!(health.num_rows, None);
        assert_eq!(health.health, ExportHealth::Unknown);
        assert!(report.recommendations.is_empty());
        assert_eq!(
            report.step(DiagnosticStep::DetectExportHealth).unwrap().status,
            StepStatus::Warning
        );
    }

    #[tokio::test]
    async fn test_api_failure_aborts() {
        let mut cloud = StubCloud::new("proj-1").account("01AB23-CD4567", true);
        cloud.probe_error = Some(ProviderError::PermissionDenied("bigquery.jobs.create".into()));

        let report = Diagnostics::new(&cloud, &cloud, "test").run(Utc::now()).await;

        assert_eq!(report.aborted_at, Some(DiagnosticStep::CheckApi));
        assert_eq!(
            report.step(DiagnosticStep::EnumerateDatasets).unwrap().status,
            StepStatus::Skipped
        );
        assert_eq!(
            report.recommendations,
            vec![Recommendation::EnableApi {
                project_id: "proj-1".into()
            }]
        );
        assert!(cloud.calls().iter().all(|c| !c.starts_with("list_tables")));
    }

    #[tokio::test]
    async fn test_account_listing_failure_degrades() {
        let mut cloud = StubCloud::new("proj-1").dataset("billing_export", Vec::new());
        cloud.accounts_error = Some(ProviderError::PermissionDenied("billing.accounts.list".into()));

        let report = Diagnostics::new(&cloud, &cloud, "test")
            .with_account(Some(BillingAccountId::parse("01AB23-CD4567").unwrap()))
            .run(Utc::now())
            .await;

        assert!(!report.is_aborted());
        assert_eq!(
            report.step(DiagnosticStep::ListBillingAccounts).unwrap().status,
            StepStatus::Warning
        );
        assert!(report.recommendations.contains(&Recommendation::GrantBillingAccess));
        assert!(matches!(
            report.recommendations.last(),
            Some(Recommendation::RunSetup { .. })
        ));
    }

    #[tokio::test]
    async fn test_expired_credentials_abort_at_authenticate() {
        let mut cloud = StubCloud::new("proj-1");
        cloud.accounts_error = Some(ProviderError::Authentication("invalid_grant".into()));

        let report = Diagnostics::new(&cloud, &cloud, "test").run(Utc::now()).await;

        assert_eq!(report.aborted_at, Some(DiagnosticStep::Authenticate));
        assert_eq!(report.recommendations, vec![Recommendation::Reauthenticate]);
        assert_eq!(cloud.calls(), vec!["list_billing_accounts"]);
    }

    #[tokio::test]
    async fn test_empty_exports_get_recommendations() {
        let cloud = StubCloud::new("proj-1")
            .account("01AB23-CD4567", true)
            .account("22BB22-BB2222", true)
            .account("33CC33-CC3333", false);
        let waiting = cloud.table_with(
            "billing",
            "gcp_billing_export_v1_01AB23_CD4567",
            0,
            Utc::now() - Duration::hours(2),
        );
        let stale = cloud.table_with(
            "billing",
            "gcp_billing_export_v1_22BB22_BB2222",
            0,
            Utc::now() - Duration::hours(72),
        );
        let cloud = cloud.dataset("billing", vec![waiting, stale]);

        let report = Diagnostics::new(&cloud, &cloud, "test").run(Utc::now()).await;

        assert_eq!(report.exports.len(), 2);
        assert!(matches!(
            report.recommendations[0],
            Recommendation::WaitForData { .. }
        ));
        assert!(matches!(
            report.recommendations[1],
            Recommendation::VerifyExport { .. }
        ));
        assert_eq!(
            report.step(DiagnosticStep::DetectExportHealth).unwrap().status,
            StepStatus::Warning
        );
    }
}

// ============================================================================
// Setup / Destroy
// ============================================================================

mod setup_flow_tests {
    use gcpbill_core::{BillingAccountId, DatasetCreation, ErrorKind, ProviderError};

    use super::stub::{ScriptedConsole, StubCloud};
    use crate::setup::{
        DatasetRemoval, DestroyRequest, SetupRequest, VERIFY_DELAY, Verification, destroy_export,
        setup_export,
    };

    fn setup_request() -> SetupRequest {
        SetupRequest {
            account: BillingAccountId::parse("01AB23-CD4567").unwrap(),
            project_id: "proj-1".into(),
            dataset_id: "billing_export".into(),
            location: "EU".into(),
        }
    }

    fn destroy_request(delete_dataset: bool) -> DestroyRequest {
        DestroyRequest {
            account: BillingAccountId::parse("01AB23-CD4567").unwrap(),
            project_id: "proj-1".into(),
            dataset_id: "billing_export".into(),
            delete_dataset,
        }
    }

    #[tokio::test]
    async fn test_setup_creates_dataset_and_skips_verification_without_input() {
        let cloud = StubCloud::new("proj-1");
        let console = ScriptedConsole::default();

        let outcome = setup_export(&cloud, &console, &setup_request()).await.unwrap();

        assert_eq!(outcome.dataset, DatasetCreation::Created);
        assert_eq!(outcome.verification, Verification::Skipped);
        assert!(cloud.calls().contains(&"create_dataset:billing_export:EU".to_string()));
        assert_eq!(
            console.opened.lock().unwrap().as_slice(),
            ["https://console.cloud.google.com/billing/01AB23-CD4567/export"]
        );
        let output = console.output();
        assert!(output.contains("Could not open browser automatically"));
        assert!(output.contains("proj-1.billing_export.gcp_billing_export_v1_01AB23_CD4567"));
        assert!(console.pauses.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_setup_verifies_table_after_confirmation() {
        let cloud = StubCloud::new("proj-1");
        let table = cloud.table("billing_export", "gcp_billing_export_v1_01AB23_CD4567");
        let cloud = cloud.dataset("billing_export", vec![table]);
        let console = ScriptedConsole {
            interactive: true,
            browser_opens: true,
            ..ScriptedConsole::default()
        };

        let outcome = setup_export(&cloud, &console, &setup_request()).await.unwrap();

        assert_eq!(outcome.dataset, DatasetCreation::AlreadyExists);
        assert_eq!(outcome.existing_tables.len(), 1);
        assert!(matches!(outcome.verification, Verification::Found(_)));
        assert_eq!(console.pauses.lock().unwrap().as_slice(), [VERIFY_DELAY]);
    }

    #[tokio::test]
    async fn test_setup_reports_missing_table() {
        let cloud = StubCloud::new("proj-1");
        let console = ScriptedConsole {
            interactive: true,
            ..ScriptedConsole::default()
        };

        let outcome = setup_export(&cloud, &console, &setup_request()).await.unwrap();

        assert_eq!(outcome.verification, Verification::NotYet);
        assert!(console.output().contains("bq ls proj-1:billing_export"));
    }

    #[tokio::test]
    async fn test_setup_access_denied_is_fatal() {
        let mut cloud = StubCloud::new("proj-1");
        cloud.probe_error = Some(ProviderError::PermissionDenied("denied".into()));
        let console = ScriptedConsole::default();

        let err = setup_export(&cloud, &console, &setup_request())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert!(console.output().contains("Access denied to project 'proj-1'"));
        assert!(cloud.calls().iter().all(|c| !c.starts_with("create_dataset")));
    }

    #[tokio::test]
    async fn test_destroy_keeps_dataset_by_default() {
        let cloud = StubCloud::new("proj-1").dataset("billing_export", Vec::new());
        let console = ScriptedConsole::default();

        let removal = destroy_export(&cloud, &console, &destroy_request(false))
            .await
            .unwrap();

        assert_eq!(removal, DatasetRemoval::Kept);
        assert!(cloud.calls().is_empty());
        assert!(console.output().contains("--delete-dataset"));
    }

    #[tokio::test]
    async fn test_destroy_deletes_dataset() {
        let cloud = StubCloud::new("proj-1").dataset("billing_export", Vec::new());
        let console = ScriptedConsole::default();

        let removal = destroy_export(&cloud, &console, &destroy_request(true))
            .await
            .unwrap();
        assert_eq!(removal, DatasetRemoval::Deleted);
        assert_eq!(cloud.calls(), vec!["delete_dataset:billing_export:true"]);

        let again = destroy_export(&cloud, &console, &destroy_request(true))
            .await
            .unwrap();
        assert_eq!(again, DatasetRemoval::NotFound);
    }

    #[tokio::test]
    async fn test_destroy_delete_failure_prints_manual_command() {
        let mut cloud = StubCloud::new("proj-1");
        cloud.delete_error = Some(ProviderError::PermissionDenied("denied".into()));
        let console = ScriptedConsole::default();

        let removal = destroy_export(&cloud, &console, &destroy_request(true))
            .await
            .unwrap();
        assert!(matches!(removal, DatasetRemoval::Failed(_)));
        assert!(console.output().contains("bq rm -r -f -d proj-1:billing_export"));
    }
}
