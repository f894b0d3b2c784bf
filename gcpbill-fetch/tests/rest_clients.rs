//! REST client tests against a mock server.

use gcpbill_core::{
    BillingApi, DatasetCreation, ProviderError, QueryRequest, TableRef, WarehouseApi,
};
use gcpbill_fetch::{ApiError, BigQueryClient, BillingClient, HttpClient};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http() -> HttpClient {
    HttpClient::authenticated("test-token").unwrap()
}

// ============================================================================
// Cloud Billing
// ============================================================================

#[tokio::test]
async fn test_billing_accounts_follow_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/billingAccounts"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "billingAccounts": [{
                "name": "billingAccounts/01AB23-CD4567-EF8901",
                "open": true,
                "displayName": "Main"
            }],
            "nextPageToken": "page-2"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/billingAccounts"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "billingAccounts": [{
                "name": "billingAccounts/0000AA-BBBBBB-CCCCCC",
                "open": false,
                "displayName": "Old"
            }]
        })))
        .mount(&server)
        .await;

    let client = BillingClient::with_base_url(http(), server.uri());
    let accounts = client.list_billing_accounts().await.unwrap();

    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts[0].id, "01AB23-CD4567-EF8901");
    assert!(accounts[0].open);
    assert!(!accounts[1].open);
}

#[tokio::test]
async fn test_project_billing_info_accepts_bare_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/billingAccounts/01AB23-CD4567-EF8901/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "projectBillingInfo": [{
                "name": "projects/proj-1/billingInfo",
                "projectId": "proj-1",
                "billingAccountName": "billingAccounts/01AB23-CD4567-EF8901",
                "billingEnabled": true
            }]
        })))
        .mount(&server)
        .await;

    let client = BillingClient::with_base_url(http(), server.uri());
    let projects = client
        .list_project_billing_info("01AB23-CD4567-EF8901")
        .await
        .unwrap();

    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].project_id, "proj-1");
    assert!(projects[0].billing_enabled);
}

#[tokio::test]
async fn test_billing_status_classification() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/billingAccounts"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {
                "code": 403,
                "message": "Cloud Billing API has not been used in project 123",
                "status": "PERMISSION_DENIED"
            }
        })))
        .mount(&server)
        .await;

    let client = BillingClient::with_base_url(http(), server.uri());
    match client.list_billing_accounts().await {
        Err(ProviderError::PermissionDenied(msg)) => {
            assert!(msg.contains("Cloud Billing API has not been used"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_is_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/billingAccounts"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Request had invalid authentication credentials."))
        .mount(&server)
        .await;

    let client = BillingClient::with_base_url(http(), server.uri());
    let err = client.list_billing_accounts().await.unwrap_err();
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_auth_headers_are_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/billingAccounts"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("x-goog-user-project", "quota-proj"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let http = http().with_quota_project(Some("quota-proj".into()));
    let client = BillingClient::with_base_url(http, server.uri());
    assert!(client.billing_accounts().await.unwrap().is_empty());
}

// ============================================================================
// BigQuery
// ============================================================================

#[tokio::test]
async fn test_list_datasets_and_tables() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/proj-1/datasets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "datasets": [
                {"datasetReference": {"projectId": "proj-1", "datasetId": "billing_export"}, "location": "US"},
                {"datasetReference": {"projectId": "proj-1", "datasetId": "analytics"}, "location": "EU"}
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/projects/proj-1/datasets/billing_export/tables"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tables": [{
                "tableReference": {
                    "projectId": "proj-1",
                    "datasetId": "billing_export",
                    "tableId": "gcp_billing_export_v1_01AB23_CD4567"
                },
                "creationTime": "1700000000000",
                "type": "TABLE"
            }]
        })))
        .mount(&server)
        .await;

    let client = BigQueryClient::with_base_url(http(), "proj-1", server.uri());

    let datasets = client.list_datasets(None).await.unwrap();
    assert_eq!(datasets.len(), 2);
    assert_eq!(datasets[1].location.as_deref(), Some("EU"));

    let tables = client.list_tables("billing_export").await.unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(
        tables[0].reference.to_string(),
        "proj-1.billing_export.gcp_billing_export_v1_01AB23_CD4567"
    );
    assert!(tables[0].created_at.is_some());
    assert!(tables[0].num_rows.is_none());
}

#[tokio::test]
async fn test_list_datasets_max_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/proj-1/datasets"))
        .and(query_param("maxResults", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "datasets": [{"datasetReference": {"projectId": "proj-1", "datasetId": "a"}}],
            "nextPageToken": "more"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = BigQueryClient::with_base_url(http(), "proj-1", server.uri());
    let datasets = client.list_datasets(Some(1)).await.unwrap();
    assert_eq!(datasets.len(), 1);
}

#[tokio::test]
async fn test_get_table_metadata() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/other-proj/datasets/billing_export/tables/gcp_billing_export_v1_X"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tableReference": {
                "projectId": "other-proj",
                "datasetId": "billing_export",
                "tableId": "gcp_billing_export_v1_X"
            },
            "numRows": "1234",
            "numBytes": "98765",
            "creationTime": "1700000000000",
            "location": "US"
        })))
        .mount(&server)
        .await;

    let client = BigQueryClient::with_base_url(http(), "proj-1", server.uri());
    let table = TableRef::parse("other-proj.billing_export.gcp_billing_export_v1_X").unwrap();
    let info = client.get_table(&table).await.unwrap();

    assert_eq!(info.num_rows, Some(1234));
    assert_eq!(info.num_bytes, Some(98765));
}

#[tokio::test]
async fn test_query_polls_and_pages() {
    let server = MockServer::start().await;
    let job = json!({"projectId": "proj-1", "jobId": "job_1", "location": "US"});
    let schema = json!({"fields": [
        {"name": "category", "type": "STRING"},
        {"name": "total_cost", "type": "FLOAT"},
        {"name": "currency", "type": "STRING"}
    ]});

    Mock::given(method("POST"))
        .and(path("/projects/proj-1/queries"))
        .and(body_partial_json(json!({
            "useLegacySql": false,
            "parameterMode": "NAMED",
            "queryParameters": [{
                "name": "project_id",
                "parameterType": {"type": "STRING"},
                "parameterValue": {"value": "proj-1"}
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobComplete": false,
            "jobReference": job
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/projects/proj-1/queries/job_1"))
        .and(query_param_is_missing("pageToken"))
        .and(query_param("location", "US"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobComplete": true,
            "jobReference": job,
            "schema": schema,
            "rows": [{"f": [{"v": "BigQuery"}, {"v": "12.5"}, {"v": "USD"}]}],
            "pageToken": "p2"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/projects/proj-1/queries/job_1"))
        .and(query_param("pageToken", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobComplete": true,
            "jobReference": job,
            "schema": schema,
            "rows": [{"f": [{"v": null}, {"v": "0.75"}, {"v": "USD"}]}]
        })))
        .mount(&server)
        .await;

    let client = BigQueryClient::with_base_url(http(), "proj-1", server.uri());
    let request = QueryRequest::new("SELECT 1").with_parameter("project_id", "proj-1");
    let rows = client.run_query(&request).await.unwrap();

    assert_eq!(rows.columns, vec!["category", "total_cost", "currency"]);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.value(0, "category"), Some("BigQuery"));
    assert_eq!(rows.value(1, "category"), None);
    assert_eq!(rows.value(1, "total_cost"), Some("0.75"));
}

#[tokio::test]
async fn test_query_syntax_error_is_query_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/projects/proj-1/queries"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "Unrecognized name: foo at [1:8]", "status": "INVALID_ARGUMENT"}
        })))
        .mount(&server)
        .await;

    let client = BigQueryClient::with_base_url(http(), "proj-1", server.uri());
    let err = client.query(&QueryRequest::new("SELECT foo")).await.unwrap_err();
    assert!(matches!(err, ApiError::Query(ref m) if m.contains("Unrecognized name")));
}

#[tokio::test]
async fn test_create_dataset_existing_is_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/projects/proj-1/datasets"))
        .and(body_partial_json(json!({
            "datasetReference": {"projectId": "proj-1", "datasetId": "billing_export"},
            "location": "US"
        })))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": {"code": 409, "message": "Already Exists: Dataset proj-1:billing_export"}
        })))
        .mount(&server)
        .await;

    let client = BigQueryClient::with_base_url(http(), "proj-1", server.uri());
    let created = client.create_dataset("billing_export", "US").await.unwrap();
    assert_eq!(created, DatasetCreation::AlreadyExists);
}

#[tokio::test]
async fn test_create_dataset() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/projects/proj-1/datasets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "proj-1:billing_export",
            "datasetReference": {"projectId": "proj-1", "datasetId": "billing_export"}
        })))
        .mount(&server)
        .await;

    let client = BigQueryClient::with_base_url(http(), "proj-1", server.uri());
    let created = client.create_dataset("billing_export", "US").await.unwrap();
    assert_eq!(created, DatasetCreation::Created);
}

#[tokio::test]
async fn test_delete_dataset() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/projects/proj-1/datasets/billing_export"))
        .and(query_param("deleteContents", "true"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/projects/proj-1/datasets/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = BigQueryClient::with_base_url(http(), "proj-1", server.uri());
    assert!(client.delete_dataset("billing_export", true).await.unwrap());
    assert!(!client.delete_dataset("missing", true).await.unwrap());
}

#[tokio::test]
async fn test_dataset_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/proj-1/datasets/nope/tables"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": 404, "message": "Not found: Dataset proj-1:nope"}
        })))
        .mount(&server)
        .await;

    let client = BigQueryClient::with_base_url(http(), "proj-1", server.uri());
    let err = client.list_tables("nope").await.unwrap_err();
    assert!(matches!(err, ProviderError::NotFound(_)));
}
