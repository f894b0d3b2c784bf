//! JSON output.

use anyhow::Result;
use serde::Serialize;

/// Renders rows as a pretty-printed array.
pub fn render<T: Serialize>(rows: &[T]) -> Result<String> {
    Ok(serde_json::to_string_pretty(rows)?)
}
