//! Cost query builder.
//!
//! Generates the aggregate SQL run against an export table. All values that
//! end up in the SQL text are validated types (`TableRef`, `DateRange`) or
//! escaped string literals; the project filter is a named parameter.

use gcpbill_core::{
    CostRow, DateCoverage, DateRange, GroupBy, ModelPattern, QueryRequest, QueryRows, TableRef,
};

use crate::error::ReportError;

/// System label holding the Vertex AI model id.
pub const VERTEX_MODEL_LABEL: &str = "goog-vertex-ai-model-id";

/// Named parameter carrying the project filter.
pub const PROJECT_PARAM: &str = "project_id";

/// Label for rows with a null category.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// `ai` bucket for AI/ML rows.
pub const AI_CATEGORY: &str = "AI/ML Services";

/// `ai` bucket for everything else.
pub const OTHER_CATEGORY: &str = "Infrastructure & Other";

const BUILTIN_MODEL_PATTERNS: &[(&str, &str)] = &[
    ("gemini 1.5 pro", "Gemini 1.5 Pro"),
    ("gemini 1.5 flash", "Gemini 1.5 Flash"),
    ("gemini pro", "Gemini Pro"),
    ("gemini flash", "Gemini Flash"),
    ("gemini ultra", "Gemini Ultra"),
    ("claude 3.5 sonnet", "Claude 3.5 Sonnet"),
    ("claude 3.5 haiku", "Claude 3.5 Haiku"),
    ("claude 3 opus", "Claude 3 Opus"),
    ("claude 3 sonnet", "Claude 3 Sonnet"),
    ("claude 3 haiku", "Claude 3 Haiku"),
    ("llama", "Llama"),
];

/// Built-in SKU description patterns, in match order.
pub fn builtin_model_patterns() -> Vec<ModelPattern> {
    BUILTIN_MODEL_PATTERNS
        .iter()
        .map(|(pattern, label)| ModelPattern::new(*pattern, *label))
        .collect()
}

/// Quotes `value` as a GoogleSQL string literal.
fn string_literal(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

/// Escapes `LIKE` wildcards so a pattern matches literally.
fn like_literal(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    string_literal(&format!("%{escaped}%"))
}

// ============================================================================
// Builder
// ============================================================================

/// Builds the grouped cost query for one export table.
#[derive(Debug, Clone)]
pub struct CostQueryBuilder {
    table: TableRef,
    range: DateRange,
    group_by: GroupBy,
    project: Option<String>,
    model_patterns: Vec<ModelPattern>,
}

impl CostQueryBuilder {
    /// Creates a builder grouping by service with the built-in model patterns.
    pub fn new(table: TableRef, range: DateRange) -> Self {
        Self {
            table,
            range,
            group_by: GroupBy::default(),
            project: None,
            model_patterns: builtin_model_patterns(),
        }
    }

    /// Sets the grouping dimension.
    pub fn group_by(mut self, group_by: GroupBy) -> Self {
        self.group_by = group_by;
        self
    }

    /// Restricts rows to one project id.
    pub fn project(mut self, project: Option<String>) -> Self {
        self.project = project.filter(|p| !p.is_empty());
        self
    }

    /// Adds patterns checked before the built-in list.
    pub fn extra_model_patterns(mut self, extra: &[ModelPattern]) -> Self {
        let mut patterns = extra.to_vec();
        patterns.append(&mut self.model_patterns);
        self.model_patterns = patterns;
        self
    }

    fn label_model_expr() -> String {
        format!(
            "(SELECT value FROM UNNEST(system_labels) WHERE key = {} LIMIT 1)",
            string_literal(VERTEX_MODEL_LABEL)
        )
    }

    fn sku_model_expr(&self) -> String {
        let mut expr = String::from("CASE");
        for p in &self.model_patterns {
            expr.push_str(&format!(
                "\n      WHEN LOWER(sku.description) LIKE {} THEN {}",
                like_literal(&p.pattern.to_lowercase()),
                string_literal(&p.label)
            ));
        }
        expr.push_str("\n      ELSE NULL\n    END");
        expr
    }

    /// SQL expression producing the `category` column.
    pub fn category_expr(&self) -> String {
        const VERTEX_SERVICE: &str = "LOWER(service.description) LIKE '%vertex ai%'";

        match self.group_by {
            GroupBy::Service => "service.description".to_string(),
            GroupBy::Project => "project.id".to_string(),
            GroupBy::Day => "FORMAT_TIMESTAMP('%Y-%m-%d', usage_start_time)".to_string(),
            GroupBy::Month => "FORMAT_TIMESTAMP('%Y-%m', usage_start_time)".to_string(),
            GroupBy::Model => format!(
                "COALESCE(\n    {},\n    {},\n    CASE\n      WHEN {VERTEX_SERVICE} THEN CONCAT('Vertex AI - ', sku.description)\n      ELSE service.description\n    END\n  )",
                Self::label_model_expr(),
                self.sku_model_expr()
            ),
            GroupBy::Ai => format!(
                "CASE\n    WHEN {} IS NOT NULL\n      OR {} IS NOT NULL\n      OR {VERTEX_SERVICE}\n    THEN {}\n    ELSE {}\n  END",
                Self::label_model_expr(),
                self.sku_model_expr(),
                string_literal(AI_CATEGORY),
                string_literal(OTHER_CATEGORY)
            ),
        }
    }

    /// Builds the query request.
    pub fn build(&self) -> QueryRequest {
        let mut sql = format!(
            "SELECT\n  {} AS category,\n  ROUND(SUM(cost), 2) AS total_cost,\n  currency\nFROM {}\nWHERE usage_start_time >= TIMESTAMP('{}')\n  AND usage_start_time < TIMESTAMP('{}')",
            self.category_expr(),
            self.table.quoted(),
            self.range.start_str(),
            self.range.end_str()
        );

        if self.project.is_some() {
            sql.push_str(&format!("\n  AND project.id = @{PROJECT_PARAM}"));
        }
        sql.push_str("\nGROUP BY category, currency\nORDER BY total_cost DESC");

        let request = QueryRequest::new(sql);
        match &self.project {
            Some(project) => request.with_parameter(PROJECT_PARAM, project.clone()),
            None => request,
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// Converts query rows into cost rows.
pub fn parse_cost_rows(rows: &QueryRows, group_by: GroupBy) -> Result<Vec<CostRow>, ReportError> {
    (0..rows.len())
        .map(|i| {
            let category = rows
                .value(i, "category")
                .filter(|c| !c.is_empty())
                .unwrap_or(UNKNOWN_CATEGORY);
            let raw_cost = rows.value(i, "total_cost").unwrap_or("0");
            let cost = raw_cost
                .parse::<f64>()
                .map_err(|_| ReportError::InvalidValue {
                    column: "total_cost".to_string(),
                    value: raw_cost.to_string(),
                })?;
            let currency = rows.value(i, "currency").unwrap_or("USD");
            Ok(CostRow::new(group_by, category, cost, currency))
        })
        .collect()
}

/// Query returning the first and last usage date in a table.
pub fn coverage_query(table: &TableRef) -> QueryRequest {
    QueryRequest::new(format!(
        "SELECT\n  MIN(DATE(usage_start_time)) AS min_date,\n  MAX(DATE(usage_start_time)) AS max_date\nFROM {}",
        table.quoted()
    ))
}

/// Reads the coverage query result.
pub fn parse_coverage(rows: &QueryRows, requested: &DateRange) -> DateCoverage {
    let date = |column: &str| {
        rows.value(0, column)
            .and_then(|v| DateRange::parse_date(v).ok())
    };
    DateCoverage::compute(date("min_date"), date("max_date"), requested)
}
