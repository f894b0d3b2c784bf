//! Report rendering.
//!
//! Row data implements [`Tabular`] and is printed as a grid table, CSV or a
//! JSON array. Notices go to stdout next to a table and to stderr otherwise,
//! so CSV and JSON output stays machine-readable.

pub mod csv;
pub mod json;
pub mod table;
pub mod text;

mod rows;


use std::io::IsTerminal;

use anyhow::Result;
use gcpbill_core::{CostRow, total_cost};
use gcpbill_store::OutputFormat;
use serde::Serialize;

pub use rows::{AccountRow, ProjectRow};
pub use text::TextFormatter;

/// Printed instead of an empty table.
pub const NO_DATA: &str = "No data to display.";

/// A record that can be shown as one table row.
pub trait Tabular: Serialize {
    /// Column names, matching the JSON keys.
    fn headers(&self) -> Vec<&'static str>;

    /// Cell values in header order.
    fn cells(&self) -> Vec<String>;
}

/// Renders rows in the requested format.
pub fn render<T: Tabular>(rows: &[T], format: OutputFormat, styled: bool) -> Result<String> {
    let Some(first) = rows.first() else {
        return Ok(NO_DATA.to_string());
    };
    let headers = first.headers();

    Ok(match format {
        OutputFormat::Table => table::render(&headers, rows.iter().map(Tabular::cells), styled),
        OutputFormat::Csv => csv::render(&headers, rows.iter().map(Tabular::cells)),
        OutputFormat::Json => json::render(rows)?,
    })
}

/// Renders rows to stdout.
pub fn print<T: Tabular>(rows: &[T], format: OutputFormat) -> Result<()> {
    let rendered = render(rows, format, std::io::stdout().is_terminal())?;
    if format == OutputFormat::Csv && !rows.is_empty() {
        print!("{rendered}");
    } else {
        println!("{rendered}");
    }
    Ok(())
}

/// Prints a human-readable message next to the data.
pub fn notice(format: OutputFormat, line: &str) {
    if format == OutputFormat::Table {
        println!("{line}");
    } else {
        eprintln!("{line}");
    }
}

/// Footer line summing cost rows.
pub fn total_line(rows: &[CostRow]) -> String {
    let (total, currency) = total_cost(rows);
    format!("Total: {total:.2} {currency}")
}

impl Tabular for CostRow {
    fn headers(&self) -> Vec<&'static str> {
        vec![self.group_by.as_str(), "cost", "currency"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.category.clone(),
            format!("{:.2}", self.cost),
            self.currency.clone(),
        ]
    }
}
