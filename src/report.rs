//! Result rows and run summary

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Outcome of one (document, rule, matched node) check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Pass,
    Fail,
    Skip,
    ParseError,
    InvalidQuery,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Pass,
        Status::Fail,
        Status::Skip,
        Status::ParseError,
        Status::InvalidQuery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
            Status::Skip => "SKIP",
            Status::ParseError => "PARSE_ERROR",
            Status::InvalidQuery => "INVALID_QUERY",
        }
    }

    /// PARSE_ERROR and INVALID_QUERY: the check could not be performed
    pub fn is_error(&self) -> bool {
        matches!(self, Status::ParseError | Status::InvalidQuery)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the validation report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    /// Document path relative to the scan root, `/`-separated
    pub relative_path: String,
    pub file_name: String,
    pub rule_id: String,
    pub description: String,
    /// Path expression after normalization
    pub path_expression: String,
    pub expected: String,
    pub actual: String,
    pub status: Status,
}

impl ResultRow {
    /// The single row emitted for a document that could not be parsed
    pub fn parse_error(relative_path: &str, file_name: &str, message: &str) -> Self {
        Self {
            relative_path: relative_path.to_string(),
            file_name: file_name.to_string(),
            rule_id: "PARSE_ERROR".to_string(),
            description: message.to_string(),
            path_expression: String::new(),
            expected: String::new(),
            actual: message.to_string(),
            status: Status::ParseError,
        }
    }
}

/// Count of rows per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pass: usize,
    pub fail: usize,
    pub skip: usize,
    pub parse_error: usize,
    pub invalid_query: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: Status) {
        match status {
            Status::Pass => self.pass += 1,
            Status::Fail => self.fail += 1,
            Status::Skip => self.skip += 1,
            Status::ParseError => self.parse_error += 1,
            Status::InvalidQuery => self.invalid_query += 1,
        }
    }

    pub fn get(&self, status: Status) -> usize {
        match status {
            Status::Pass => self.pass,
            Status::Fail => self.fail,
            Status::Skip => self.skip,
            Status::ParseError => self.parse_error,
            Status::InvalidQuery => self.invalid_query,
        }
    }

    pub fn total(&self) -> usize {
        self.pass + self.fail + self.skip + self.parse_error + self.invalid_query
    }
}

/// Summary of a run; observational only
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub rules_loaded: usize,
    pub documents_processed: usize,
    /// Documents not started because the deadline passed
    pub documents_skipped: usize,
    pub counts: StatusCounts,
    pub duration_ms: u128,
}

/// Ordered rows of a run plus summary information
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub rows: Vec<ResultRow>,
    pub rules_loaded: usize,
    pub documents_processed: usize,
    pub documents_skipped: usize,
    pub duration: Duration,
}

impl Report {
    pub fn new(rules_loaded: usize) -> Self {
        Self {
            rules_loaded,
            ..Self::default()
        }
    }

    /// Append the rows of one document
    pub fn push_document(&mut self, rows: Vec<ResultRow>) {
        self.documents_processed += 1;
        self.rows.extend(rows);
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for row in &self.rows {
            counts.add(row.status);
        }
        counts
    }

    pub fn summary(&self) -> Summary {
        Summary {
            rules_loaded: self.rules_loaded,
            documents_processed: self.documents_processed,
            documents_skipped: self.documents_skipped,
            counts: self.counts(),
            duration_ms: self.duration.as_millis(),
        }
    }

    /// Check if any row failed
    pub fn has_failures(&self) -> bool {
        self.rows.iter().any(|r| r.status == Status::Fail)
    }

    /// Check if any check could not be performed
    pub fn has_errors(&self) -> bool {
        self.rows.iter().any(|r| r.status.is_error())
    }

    /// Get exit code (0 = clean, 1 = failures, 2 = parse or query errors)
    pub fn exit_code(&self) -> i32 {
        if self.has_errors() {
            2
        } else if self.has_failures() {
            1
        } else {
            0
        }
    }
}
