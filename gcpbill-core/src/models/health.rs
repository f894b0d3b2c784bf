//! Export health classification.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hours after table creation within which an empty table is expected.
pub const EXPORT_GRACE_HOURS: f64 = 24.0;

/// Health of a detected export table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExportHealth {
    /// Empty and younger than the grace period.
    Waiting {
        /// Hours since creation.
        hours_elapsed: f64,
        /// Hours until the grace period ends.
        hours_remaining: f64,
    },
    /// Empty and older than the grace period.
    Misconfigured {
        /// Hours since creation.
        hours_elapsed: f64,
    },
    /// Empty with unknown creation time.
    Empty,
    /// Row count could not be read from table metadata.
    Unknown,
    /// Contains rows.
    Working {
        /// Row count.
        rows: u64,
    },
}

impl ExportHealth {
    /// Classifies a table from its row count and creation time.
    ///
    /// A missing row count is never treated as zero rows.
    #[allow(clippy::cast_precision_loss)]
    pub fn classify(
        num_rows: Option<u64>,
        created_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        match num_rows {
            None => return Self::Unknown,
            Some(rows) if rows > 0 => return Self::Working { rows },
            Some(_) => {}
        }

        let Some(created_at) = created_at else {
            return Self::Empty;
        };

        let hours_elapsed = (now - created_at).num_seconds() as f64 / 3600.0;
        if hours_elapsed < EXPORT_GRACE_HOURS {
            Self::Waiting {
                hours_elapsed,
                hours_remaining: EXPORT_GRACE_HOURS - hours_elapsed,
            }
        } else {
            Self::Misconfigured { hours_elapsed }
        }
    }

    /// Short status label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Waiting { .. } => "waiting",
            Self::Misconfigured { .. } => "misconfigured",
            Self::Empty => "empty",
            Self::Unknown => "unknown",
            Self::Working { .. } => "working",
        }
    }

    /// Returns true if the table has data.
    pub fn is_working(&self) -> bool {
        matches!(self, Self::Working { .. })
    }
}

impl fmt::Display for ExportHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting { hours_remaining, .. } => {
                write!(f, "waiting (data expected in ~{hours_remaining:.1} hours)")
            }
            Self::Misconfigured { .. } => f.write_str("misconfigured, needs verification"),
            Self::Empty => f.write_str("empty (creation time unknown)"),
            Self::Unknown => f.write_str("row count unknown"),
            Self::Working { rows } => write!(f, "working ({rows} rows)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_young_empty_table_is_waiting() {
        let now = Utc::now();
        let health = ExportHealth::classify(Some(0), Some(now - Duration::hours(3)), now);
        assert_eq!(health.label(), "waiting");
        match health {
            ExportHealth::Waiting { hours_remaining, .. } => {
                assert!((hours_remaining - 21.0).abs() < 0.01);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_old_empty_table_is_misconfigured() {
        let now = Utc::now();
        let health = ExportHealth::classify(Some(0), Some(now - Duration::hours(30)), now);
        assert_eq!(health.label(), "misconfigured");
        assert!(health.to_string().contains("needs verification"));
    }

    #[test]
    fn test_boundary_is_misconfigured() {
        let now = Utc::now();
        let health = ExportHealth::classify(Some(0), Some(now - Duration::hours(24)), now);
        assert_eq!(health.label(), "misconfigured");
    }

    #[test]
    fn test_rows_mean_working_regardless_of_age() {
        let now = Utc::now();
        let health = ExportHealth::classify(Some(42), Some(now - Duration::minutes(5)), now);
        assert_eq!(health, ExportHealth::Working { rows: 42 });
        assert!(health.is_working());
    }

    #[test]
    fn test_unknown_creation_time() {
        assert_eq!(ExportHealth::classify(Some(0), None, Utc::now()), ExportHealth::Empty);
    }

    #[test]
    fn test_missing_row_count_is_unknown() {
        let now = Utc::now();
        let health = ExportHealth::classify(None, Some(now - Duration::days(10)), now);
        assert_eq!(health, ExportHealth::Unknown);
        assert_eq!(health.label(), "unknown");
        assert!(!health.is_working());
    }
}
