//! Human-readable text output formatter

use super::ReportFormatter;
use crate::report::{Report, ResultRow, Status};
use colored::*;

/// Text formatter with optional color support
pub struct TextFormatter {
    /// Enable colored output
    pub colored: bool,

    /// Show PASS rows (otherwise only rows needing attention)
    pub show_passed: bool,

    /// Show statistics
    pub show_stats: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            colored: true,
            show_passed: true,
            show_stats: true,
        }
    }
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable colors
    pub fn without_color(mut self) -> Self {
        self.colored = false;
        self
    }

    /// Hide PASS rows
    pub fn failures_only(mut self) -> Self {
        self.show_passed = false;
        self
    }

    fn status_str(&self, status: Status) -> ColoredString {
        let s = format!("{:<13}", status.as_str());
        if !self.colored {
            return s.normal();
        }
        match status {
            Status::Pass => s.green(),
            Status::Fail => s.red().bold(),
            Status::Skip => s.dimmed(),
            Status::ParseError | Status::InvalidQuery => s.magenta().bold(),
        }
    }

    fn paint(&self, text: String, color: Color) -> String {
        if self.colored {
            text.color(color).to_string()
        } else {
            text
        }
    }

    fn summary(&self, report: &Report) -> String {
        let counts = report.counts();
        let mut output = format!(
            "\n{} {} processed, {} {} loaded",
            report.documents_processed,
            if report.documents_processed == 1 {
                "document"
            } else {
                "documents"
            },
            report.rules_loaded,
            if report.rules_loaded == 1 {
                "rule"
            } else {
                "rules"
            }
        );

        let parts = [
            (counts.pass, "passed", Color::Green),
            (counts.fail, "failed", Color::Red),
            (counts.skip, "skipped", Color::White),
            (counts.parse_error, "parse errors", Color::Magenta),
            (counts.invalid_query, "invalid queries", Color::Magenta),
        ];
        let shown: Vec<String> = parts
            .iter()
            .filter(|(n, _, _)| *n > 0)
            .map(|(n, label, color)| self.paint(format!("{} {}", n, label), *color))
            .collect();
        if !shown.is_empty() {
            output.push_str(&format!(": {}", shown.join(", ")));
        }

        output.push_str(&format!(" ({:.2?})", report.duration));

        if report.documents_skipped > 0 {
            output.push_str(&format!(
                "\n{}",
                self.paint(
                    format!(
                        "{} documents not validated: deadline reached",
                        report.documents_skipped
                    ),
                    Color::Yellow
                )
            ));
        }

        output.push('\n');
        output
    }
}

impl ReportFormatter for TextFormatter {
    fn format(&self, report: &Report) -> String {
        let mut output = String::new();
        let mut current: Option<&str> = None;

        for row in &report.rows {
            if !self.show_passed && row.status == Status::Pass {
                continue;
            }

            if current != Some(row.relative_path.as_str()) {
                if current.is_some() {
                    output.push('\n');
                }
                if self.colored {
                    output.push_str(&format!("{}\n", row.relative_path.underline()));
                } else {
                    output.push_str(&format!("{}\n", row.relative_path));
                }
                current = Some(row.relative_path.as_str());
            }

            output.push_str(&self.format_row(row));
            output.push('\n');
        }

        if self.show_stats {
            output.push_str(&self.summary(report));
        }

        output
    }

    fn format_row(&self, row: &ResultRow) -> String {
        if row.status == Status::ParseError {
            return format!("  {} {}", self.status_str(row.status), row.actual);
        }

        let mut line = format!("  {} {}", self.status_str(row.status), row.rule_id);
        if !row.description.is_empty() {
            line.push_str(&format!(": {}", row.description));
        }

        match row.status {
            Status::Pass | Status::Fail if !row.actual.is_empty() || !row.expected.is_empty() => {
                line.push_str(&format!(
                    " (actual \"{}\", expected \"{}\")",
                    row.actual, row.expected
                ));
            }
            Status::Fail | Status::Skip => {
                line.push_str(" (no match)");
            }
            Status::InvalidQuery => {
                line.push_str(&format!(" [{}]", row.path_expression));
            }
            _ => {}
        }

        line
    }
}
