//! Report formatters

mod csv;
mod json;
mod text;

pub use self::csv::CsvFormatter;
pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::config::OutputFormat;
use crate::report::{Report, ResultRow};

/// Report formatter trait
pub trait ReportFormatter: Send + Sync {
    /// Format the entire report
    fn format(&self, report: &Report) -> String;

    /// Format a single row
    fn format_row(&self, row: &ResultRow) -> String;
}

/// Formatter for a configured output format
pub fn formatter_for(format: OutputFormat, colored: bool) -> Box<dyn ReportFormatter> {
    match format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new();
            if colored {
                Box::new(formatter)
            } else {
                Box::new(formatter.without_color())
            }
        }
        OutputFormat::Json => Box::new(JsonFormatter::new().pretty()),
        OutputFormat::Csv => Box::new(CsvFormatter::new()),
    }
}
