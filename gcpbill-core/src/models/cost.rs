//! Cost report types.
//!
//! - [`GroupBy`] - Grouping dimension for cost rows
//! - [`DateRange`] - Half-open `[start, end)` range of dates
//! - [`CostRow`] - One aggregated row of exported billing data
//! - [`DateCoverage`] - Date span actually present in the export table
//! - [`ModelPattern`] - SKU substring to model label rule

use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::CoreError;

/// Date format accepted on the command line and used in SQL literals.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// Group By
// ============================================================================

/// Dimension used to aggregate cost rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    /// Service description (`Compute Engine`, `BigQuery`, ...).
    #[default]
    Service,
    /// Project id.
    Project,
    /// Calendar day of `usage_start_time`.
    Day,
    /// Calendar month of `usage_start_time`.
    Month,
    /// Two buckets: AI/ML services vs. everything else.
    Ai,
    /// Model attribution heuristic.
    Model,
}

impl GroupBy {
    /// Returns all dimensions.
    pub fn all() -> &'static [GroupBy] {
        &[
            Self::Service,
            Self::Project,
            Self::Day,
            Self::Month,
            Self::Ai,
            Self::Model,
        ]
    }

    /// Lowercase name, also used as the output column label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Project => "project",
            Self::Day => "day",
            Self::Month => "month",
            Self::Ai => "ai",
            Self::Model => "model",
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupBy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|g| g.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::UnknownValue(s.to_string()))
    }
}

// ============================================================================
// Date Range
// ============================================================================

/// Half-open range of calendar dates, `start <= d < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range. `start` must be strictly before `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        if start >= end {
            return Err(CoreError::InvalidDateRange {
                start: start.format(DATE_FORMAT).to_string(),
                end: end.format(DATE_FORMAT).to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parses a `YYYY-MM-DD` date.
    pub fn parse_date(s: &str) -> Result<NaiveDate, CoreError> {
        NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .map_err(|_| CoreError::InvalidDate(s.to_string()))
    }

    /// Builds a range from optional CLI inputs.
    ///
    /// Missing `end` defaults to `today`; missing `start` to `lookback_days`
    /// before the end.
    pub fn resolve(
        start: Option<&str>,
        end: Option<&str>,
        today: NaiveDate,
        lookback_days: u32,
    ) -> Result<Self, CoreError> {
        let end = match end {
            Some(s) => Self::parse_date(s)?,
            None => today,
        };
        let start = match start {
            Some(s) => Self::parse_date(s)?,
            None => end
                .checked_sub_days(Days::new(u64::from(lookback_days)))
                .unwrap_or(NaiveDate::MIN),
        };
        Self::new(start, end)
    }

    /// Inclusive start.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Exclusive end.
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Start as `YYYY-MM-DD`.
    pub fn start_str(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    /// End as `YYYY-MM-DD`.
    pub fn end_str(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start_str(), self.end_str())
    }
}

// ============================================================================
// Cost Row
// ============================================================================

/// One aggregated row.
///
/// Serializes with the grouping dimension as the key of the category, e.g.
/// `{"service": "BigQuery", "cost": 1.25, "currency": "USD"}`.
#[derive(Debug, Clone, PartialEq)]
pub struct CostRow {
    /// Dimension this row was grouped by.
    pub group_by: GroupBy,
    /// Category value (`Unknown` when the column was null).
    pub category: String,
    /// Summed cost, rounded to cents by the query.
    pub cost: f64,
    /// Currency code.
    pub currency: String,
}

impl CostRow {
    /// Creates a row.
    pub fn new(
        group_by: GroupBy,
        category: impl Into<String>,
        cost: f64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            group_by,
            category: category.into(),
            cost,
            currency: currency.into(),
        }
    }
}

impl Serialize for CostRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry(self.group_by.as_str(), &self.category)?;
        map.serialize_entry("cost", &self.cost)?;
        map.serialize_entry("currency", &self.currency)?;
        map.end()
    }
}

/// Sums row costs. Currency is taken from the first row, `USD` when empty.
pub fn total_cost(rows: &[CostRow]) -> (f64, &str) {
    let total = rows.iter().fold(0.0, |acc, r| acc + r.cost);
    let currency = rows.first().map_or("USD", |r| r.currency.as_str());
    (total, currency)
}

// ============================================================================
// Date Coverage
// ============================================================================

/// Usage dates present in an export table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateCoverage {
    /// Earliest usage date.
    pub min_date: Option<NaiveDate>,
    /// Latest usage date.
    pub max_date: Option<NaiveDate>,
    /// True when the requested range does not overlap the data.
    pub outside_range: bool,
}

impl DateCoverage {
    /// Computes coverage for a requested range.
    pub fn compute(
        min_date: Option<NaiveDate>,
        max_date: Option<NaiveDate>,
        requested: &DateRange,
    ) -> Self {
        let outside_range = match (min_date, max_date) {
            (Some(min), Some(max)) => requested.end() < min || requested.start() > max,
            _ => true,
        };
        Self {
            min_date,
            max_date,
            outside_range,
        }
    }

    /// Returns true if the table has any dated rows.
    pub fn has_data(&self) -> bool {
        self.min_date.is_some() && self.max_date.is_some()
    }
}

// ============================================================================
// Model Patterns
// ============================================================================

/// Maps a lower-case SKU description substring to a model label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPattern {
    /// Substring matched against the lower-cased SKU description.
    pub pattern: String,
    /// Label reported for matching rows.
    pub label: String,
}

impl ModelPattern {
    /// Creates a pattern. The pattern is lower-cased.
    pub fn new(pattern: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into().to_lowercase(),
            label: label.into(),
        }
    }
}
