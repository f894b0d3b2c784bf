//! BigQuery v2 REST client.
//!
//! Covers the calls the report flows need: dataset and table listing, table
//! metadata, synchronous queries (with job polling and result paging), and
//! dataset creation and deletion.

use chrono::{DateTime, Utc};
use gcpbill_core::{
    DatasetCreation, DatasetInfo, ProviderError, QueryRequest, QueryRows, TableInfo, TableRef,
    WarehouseApi,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::ApiError;
use crate::host::http::HttpClient;

/// BigQuery API base URL.
pub const BIGQUERY_API_BASE: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Server-side wait per query call.
const QUERY_TIMEOUT_MS: u32 = 10_000;

/// Polls of an incomplete job before giving up.
const MAX_JOB_POLLS: u32 = 30;

const LIST_PAGE_SIZE: &str = "1000";

const NO_QUERY: [(&str, &str); 0] = [];

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetList {
    #[serde(default)]
    datasets: Vec<DatasetListEntry>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetListEntry {
    dataset_reference: DatasetReference,
    location: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetReference {
    project_id: String,
    dataset_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableList {
    #[serde(default)]
    tables: Vec<TableResource>,
    next_page_token: Option<String>,
}

/// Table as returned by `tables.list` and `tables.get`.
///
/// Int64 fields arrive as JSON strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableResource {
    table_reference: TableReference,
    location: Option<String>,
    creation_time: Option<String>,
    num_rows: Option<String>,
    num_bytes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableReference {
    project_id: String,
    dataset_id: String,
    table_id: String,
}

impl TableResource {
    fn into_info(self) -> Result<TableInfo, ApiError> {
        let r = self.table_reference;
        let reference = TableRef::new(r.project_id, r.dataset_id, r.table_id)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

        let mut info = TableInfo::new(reference);
        info.location = self.location;
        info.created_at = self
            .creation_time
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(DateTime::<Utc>::from_timestamp_millis);
        info.num_rows = self.num_rows.and_then(|n| n.parse().ok());
        info.num_bytes = self.num_bytes.and_then(|n| n.parse().ok());
        Ok(info)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody<'a> {
    query: &'a str,
    use_legacy_sql: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameter_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    query_parameters: Vec<ParameterBody<'a>>,
    timeout_ms: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ParameterBody<'a> {
    name: &'a str,
    parameter_type: ParameterType,
    parameter_value: ParameterValue<'a>,
}

#[derive(Debug, Serialize)]
struct ParameterType {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ParameterValue<'a> {
    value: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    schema: Option<Schema>,
    #[serde(default)]
    rows: Vec<Row>,
    #[serde(default)]
    job_complete: bool,
    job_reference: Option<JobReference>,
    page_token: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct Schema {
    #[serde(default)]
    fields: Vec<Field>,
}

#[derive(Debug, Deserialize)]
struct Field {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(default)]
    f: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    #[serde(default)]
    v: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewDataset<'a> {
    dataset_reference: DatasetReferenceRef<'a>,
    location: &'a str,
    description: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DatasetReferenceRef<'a> {
    project_id: &'a str,
    dataset_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct Ignored {}

fn cell_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

// ============================================================================
// Client
// ============================================================================

/// BigQuery client bound to one project.
#[derive(Debug, Clone)]
pub struct BigQueryClient {
    http: HttpClient,
    base_url: String,
    project_id: String,
}

impl BigQueryClient {
    /// Creates a client against the public endpoint.
    pub fn new(http: HttpClient, project_id: impl Into<String>) -> Self {
        Self::with_base_url(http, project_id, BIGQUERY_API_BASE)
    }

    /// Creates a client against a custom base URL.
    pub fn with_base_url(
        http: HttpClient,
        project_id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            project_id: project_id.into(),
        }
    }

    /// Builds `<base>/projects/<project>/<segments...>`.
    fn endpoint(&self, segments: &[&str]) -> Result<String, ApiError> {
        self.project_endpoint(&self.project_id, segments)
    }

    fn project_endpoint(&self, project_id: &str, segments: &[&str]) -> Result<String, ApiError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["projects", project_id])
            .extend(segments);
        Ok(url.into())
    }

    /// Lists datasets.
    #[instrument(skip(self), fields(project = %self.project_id))]
    pub async fn datasets(&self, max_results: Option<u32>) -> Result<Vec<DatasetInfo>, ApiError> {
        let url = self.endpoint(&["datasets"])?;
        let mut datasets = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![(
                "maxResults",
                max_results.map_or_else(|| LIST_PAGE_SIZE.to_string(), |m| m.to_string()),
            )];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let page: DatasetList = self.http.get_json(&url, &query).await?;
            datasets.extend(page.datasets.into_iter().map(|d| DatasetInfo {
                project_id: d.dataset_reference.project_id,
                dataset_id: d.dataset_reference.dataset_id,
                location: d.location,
            }));

            if max_results.is_some() {
                break;
            }
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = datasets.len(), "Listed datasets");
        Ok(datasets)
    }

    /// Lists tables in a dataset.
    #[instrument(skip(self), fields(project = %self.project_id))]
    pub async fn tables(&self, dataset_id: &str) -> Result<Vec<TableInfo>, ApiError> {
        let url = self.endpoint(&["datasets", dataset_id, "tables"])?;
        let mut tables = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("maxResults", LIST_PAGE_SIZE.to_string())];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let page: TableList = self.http.get_json(&url, &query).await?;
            for table in page.tables {
                match table.into_info() {
                    Ok(info) => tables.push(info),
                    Err(e) => debug!(error = %e, "Skipping table"),
                }
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = tables.len(), "Listed tables");
        Ok(tables)
    }

    /// Fetches table metadata.
    #[instrument(skip(self), fields(table = %table))]
    pub async fn table(&self, table: &TableRef) -> Result<TableInfo, ApiError> {
        // The table may live in another project than the client's.
        let url = self.project_endpoint(
            &table.project_id,
            &["datasets", &table.dataset_id, "tables", &table.table_id],
        )?;

        let resource: TableResource = self.http.get_json(&url, &NO_QUERY).await?;
        resource.into_info()
    }

    /// Runs a query and collects every result row.
    #[instrument(skip(self, request), fields(project = %self.project_id))]
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryRows, ApiError> {
        let url = self.endpoint(&["queries"])?;
        let body = QueryBody {
            query: &request.sql,
            use_legacy_sql: false,
            parameter_mode: (!request.parameters.is_empty()).then_some("NAMED"),
            query_parameters: request
                .parameters
                .iter()
                .map(|p| ParameterBody {
                    name: &p.name,
                    parameter_type: ParameterType { kind: "STRING" },
                    parameter_value: ParameterValue { value: &p.value },
                })
                .collect(),
            timeout_ms: QUERY_TIMEOUT_MS,
        };

        debug!(sql = %request.sql, "Running query");
        let mut response: QueryResponse =
            self.http.post_json(&url, &body).await.map_err(query_error)?;

        let mut polls = 0;
        while !response.job_complete {
            let job = response
                .job_reference
                .clone()
                .ok_or_else(|| ApiError::InvalidResponse("incomplete job without reference".into()))?;
            polls += 1;
            if polls > MAX_JOB_POLLS {
                return Err(ApiError::Query(format!("job {} did not complete", job.job_id)));
            }
            debug!(job_id = %job.job_id, polls, "Waiting for query job");
            response = self.query_results(&job, None).await?;
        }

        for error in &response.errors {
            warn!(message = %error.message, "Query reported an error");
        }

        let columns = response
            .schema
            .as_ref()
            .map(|s| s.fields.iter().map(|f| f.name.clone()).collect::<Vec<_>>())
            .unwrap_or_default();
        let mut rows = QueryRows::with_columns(columns);
        let job = response.job_reference.clone();
        let mut page_token = response.page_token.take();
        append_rows(&mut rows, response.rows);

        while let Some(token) = page_token.filter(|t| !t.is_empty()) {
            let Some(job) = job.as_ref() else { break };
            let page = self.query_results(job, Some(&token)).await?;
            page_token = page.page_token;
            append_rows(&mut rows, page.rows);
        }

        debug!(rows = rows.len(), "Query complete");
        Ok(rows)
    }

    async fn query_results(
        &self,
        job: &JobReference,
        page_token: Option<&str>,
    ) -> Result<QueryResponse, ApiError> {
        let url = self.endpoint(&["queries", &job.job_id])?;
        let mut query = vec![("timeoutMs", QUERY_TIMEOUT_MS.to_string())];
        if let Some(location) = &job.location {
            query.push(("location", location.clone()));
        }
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        self.http.get_json(&url, &query).await.map_err(query_error)
    }

    /// Creates a dataset.
    #[instrument(skip(self), fields(project = %self.project_id))]
    pub async fn insert_dataset(
        &self,
        dataset_id: &str,
        location: &str,
    ) -> Result<DatasetCreation, ApiError> {
        let url = self.endpoint(&["datasets"])?;
        let body = NewDataset {
            dataset_reference: DatasetReferenceRef {
                project_id: &self.project_id,
                dataset_id,
            },
            location,
            description: "Cloud Billing export",
        };

        match self.http.post_json::<_, Ignored>(&url, &body).await {
            Ok(_) => {
                info!(dataset = %dataset_id, "Created dataset");
                Ok(DatasetCreation::Created)
            }
            Err(ApiError::Conflict(_)) => {
                debug!(dataset = %dataset_id, "Dataset already exists");
                Ok(DatasetCreation::AlreadyExists)
            }
            Err(e) => Err(e),
        }
    }

    /// Deletes a dataset. Returns false if it did not exist.
    #[instrument(skip(self), fields(project = %self.project_id))]
    pub async fn remove_dataset(
        &self,
        dataset_id: &str,
        delete_contents: bool,
    ) -> Result<bool, ApiError> {
        let url = self.endpoint(&["datasets", dataset_id])?;
        let query = [("deleteContents", delete_contents.to_string())];
        let deleted = self.http.delete(&url, &query).await?;
        if deleted {
            info!(dataset = %dataset_id, "Deleted dataset");
        }
        Ok(deleted)
    }
}

fn append_rows(rows: &mut QueryRows, page: Vec<Row>) {
    for row in page {
        rows.push_row(row.f.into_iter().map(|c| cell_to_string(c.v)).collect());
    }
}

/// Query endpoints report SQL errors as HTTP 400.
fn query_error(err: ApiError) -> ApiError {
    match err {
        ApiError::Status {
            status: 400,
            message,
        } => ApiError::Query(message),
        other => other,
    }
}

impl WarehouseApi for BigQueryClient {
    fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn list_datasets(
        &self,
        max_results: Option<u32>,
    ) -> Result<Vec<DatasetInfo>, ProviderError> {
        Ok(self.datasets(max_results).await?)
    }

    async fn list_tables(&self, dataset_id: &str) -> Result<Vec<TableInfo>, ProviderError> {
        Ok(self.tables(dataset_id).await?)
    }

    async fn get_table(&self, table: &TableRef) -> Result<TableInfo, ProviderError> {
        Ok(self.table(table).await?)
    }

    async fn run_query(&self, request: &QueryRequest) -> Result<QueryRows, ProviderError> {
        Ok(self.query(request).await?)
    }

    async fn create_dataset(
        &self,
        dataset_id: &str,
        location: &str,
    ) -> Result<DatasetCreation, ProviderError> {
        Ok(self.insert_dataset(dataset_id, location).await?)
    }

    async fn delete_dataset(
        &self,
        dataset_id: &str,
        delete_contents: bool,
    ) -> Result<bool, ProviderError> {
        Ok(self.remove_dataset(dataset_id, delete_contents).await?)
    }
}
