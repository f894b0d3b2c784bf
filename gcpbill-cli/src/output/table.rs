//! Grid table output.

use comfy_table::{Cell, Color, ContentArrangement, Table, presets::ASCII_FULL};

/// Renders a bordered grid.
///
/// `styled` colors the header; it should only be set when writing to a
/// terminal.
pub fn render<I>(headers: &[&str], rows: I, styled: bool) -> String
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    if styled {
        table.set_header(headers.iter().map(|h| Cell::new(h).fg(Color::Cyan)));
    } else {
        table.force_no_tty();
        table.set_header(headers.iter().map(Cell::new));
    }

    for row in rows {
        table.add_row(row.into_iter().map(Cell::new));
    }

    table.to_string()
}
