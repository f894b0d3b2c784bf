//! CSV output with RFC 4180 quoting.

use std::borrow::Cow;

const LINE_END: &str = "\r\n";

/// Quotes a field when it contains a comma, quote or line break.
pub fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

fn record<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = fields
        .iter()
        .map(|f| escape(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    line.push_str(LINE_END);
    line
}

/// Renders a header line plus one line per row, each ending in CRLF.
pub fn render<I>(headers: &[&str], rows: I) -> String
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut out = record(headers);
    for row in rows {
        out.push_str(&record(&row));
    }
    out
}
