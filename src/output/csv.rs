//! CSV output formatter
//!
//! One line per row under the report column headers, quoted per RFC 4180.

use super::ReportFormatter;
use crate::report::{Report, ResultRow};

/// Column headers of the tabular report
pub const HEADERS: [&str; 8] = [
    "ARXML Path",
    "ARXML File",
    "Rule ID",
    "Description",
    "XPath",
    "Expected",
    "Actual",
    "Status",
];

/// CSV formatter for spreadsheet import
#[derive(Default)]
pub struct CsvFormatter;

impl CsvFormatter {
    pub fn new() -> Self {
        Self
    }
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn record<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    fields.into_iter().map(escape).collect::<Vec<_>>().join(",")
}

impl ReportFormatter for CsvFormatter {
    fn format(&self, report: &Report) -> String {
        let mut output = record(HEADERS);
        output.push_str("\r\n");
        for row in &report.rows {
            output.push_str(&self.format_row(row));
            output.push_str("\r\n");
        }
        output
    }

    fn format_row(&self, row: &ResultRow) -> String {
        record([
            row.relative_path.as_str(),
            row.file_name.as_str(),
            row.rule_id.as_str(),
            row.description.as_str(),
            row.path_expression.as_str(),
            row.expected.as_str(),
            row.actual.as_str(),
            row.status.as_str(),
        ])
    }
}
