//! JSON output formatter

use super::ReportFormatter;
use crate::report::{Report, ResultRow, Summary};
use serde::Serialize;

/// JSON formatter for machine-readable output
#[derive(Default)]
pub struct JsonFormatter {
    /// Pretty print with indentation
    pub pretty: bool,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable pretty printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    fn to_string<T: Serialize>(&self, value: &T) -> String {
        if self.pretty {
            serde_json::to_string_pretty(value).unwrap_or_default()
        } else {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    rows: &'a [ResultRow],
    summary: Summary,
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &Report) -> String {
        let output = JsonOutput {
            rows: &report.rows,
            summary: report.summary(),
        };
        self.to_string(&output)
    }

    fn format_row(&self, row: &ResultRow) -> String {
        self.to_string(row)
    }
}
