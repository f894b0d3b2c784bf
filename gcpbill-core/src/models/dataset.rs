//! BigQuery dataset and table types.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// Project ids may be domain-scoped (`example.com:my-project`).
static PROJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9.:\-]*[a-z0-9]$").expect("valid regex"));
static DATASET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{1,1024}$").expect("valid regex"));
static TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-$]{1,1024}$").expect("valid regex"));

/// Returns true if `id` is a valid dataset id.
pub fn is_valid_dataset_id(id: &str) -> bool {
    DATASET_RE.is_match(id)
}

/// Returns true if `id` is a valid project id.
pub fn is_valid_project_id(id: &str) -> bool {
    PROJECT_RE.is_match(id)
}

// ============================================================================
// Table Ref
// ============================================================================

/// Fully-qualified `project.dataset.table` reference.
///
/// Components are validated on construction, so the backtick-quoted form is
/// safe to splice into SQL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    /// Project id.
    pub project_id: String,
    /// Dataset id.
    pub dataset_id: String,
    /// Table id.
    pub table_id: String,
}

impl TableRef {
    /// Creates a validated reference.
    pub fn new(
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
        table_id: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let r = Self {
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
            table_id: table_id.into(),
        };

        if !PROJECT_RE.is_match(&r.project_id)
            || !DATASET_RE.is_match(&r.dataset_id)
            || !TABLE_RE.is_match(&r.table_id)
        {
            return Err(CoreError::InvalidTableRef(r.to_string()));
        }

        Ok(r)
    }

    /// Parses `project.dataset.table`.
    pub fn parse(path: &str) -> Result<Self, CoreError> {
        let mut parts = path.rsplitn(3, '.');
        let (Some(table), Some(dataset), Some(project)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(CoreError::InvalidTableRef(path.to_string()));
        };
        Self::new(project, dataset, table)
    }

    /// Backtick-quoted form for SQL.
    pub fn quoted(&self) -> String {
        format!("`{self}`")
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project_id, self.dataset_id, self.table_id)
    }
}

// ============================================================================
// Dataset / Table Info
// ============================================================================

/// A dataset in the client's project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetInfo {
    /// Owning project.
    pub project_id: String,
    /// Dataset id.
    pub dataset_id: String,
    /// Location (`US`, `EU`, ...), when known.
    pub location: Option<String>,
}

impl DatasetInfo {
    /// Creates a dataset entry.
    pub fn new(project_id: impl Into<String>, dataset_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
            location: None,
        }
    }
}

/// Table metadata.
///
/// Listing endpoints omit row and byte counts; `get_table` fills them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Fully-qualified reference.
    pub reference: TableRef,
    /// Location, when known.
    pub location: Option<String>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Row count.
    pub num_rows: Option<u64>,
    /// Stored bytes.
    pub num_bytes: Option<u64>,
}

impl TableInfo {
    /// Creates a table entry with unknown metadata.
    pub fn new(reference: TableRef) -> Self {
        Self {
            reference,
            location: None,
            created_at: None,
            num_rows: None,
            num_bytes: None,
        }
    }

    /// Hours elapsed since creation.
    #[allow(clippy::cast_precision_loss)]
    pub fn hours_since_creation(&self, now: DateTime<Utc>) -> Option<f64> {
        self.created_at
            .map(|created| (now - created).num_seconds() as f64 / 3600.0)
    }
}
