//! arxcheck - rule-driven structural validator for XML and AUTOSAR ARXML
//!
//! Applies a set of declarative rules to every document under a directory
//! tree. Each rule names a path expression, a condition and an expected
//! value; every matched node yields one PASS/FAIL row, and a rule that
//! matches nothing yields a FAIL (mandatory) or SKIP (optional) row.
//!
//! # Architecture
//!
//! ```text
//! RuleSet -> Engine <- Scanner
//! Engine -> normalize -> TreeBackend/DocumentTree -> Matcher -> Report -> ReportFormatter
//! ```
//!
//! Path expressions are rewritten to match elements by local name, so the
//! same rule works on namespaced and non-namespaced documents.
//!
//! # Rule files
//!
//! ```yaml
//! rules:
//!   - rule_id: R001
//!     description: Schema version
//!     xpath: /AUTOSAR/ADMIN-DATA/SDGS/SDG/SD
//!     condition: EQUALS
//!     expected: "1.0.0"
//!     mandatory: true
//! ```

pub mod backend;
pub mod backends;
pub mod condition;
pub mod config;
pub mod engine;
pub mod normalize;
pub mod output;
pub mod report;
pub mod rule;
pub mod scan;

// Re-export main types
pub use backend::{DocumentTree, ParseError, QueryError, TreeBackend};
pub use condition::{evaluate, Condition, Matcher, RuleCondition};
pub use config::{Config, ConfigError, OutputFormat};
pub use engine::{Engine, EngineError};
pub use normalize::normalize;
pub use output::{CsvFormatter, JsonFormatter, ReportFormatter, TextFormatter};
pub use report::{Report, ResultRow, Status, Summary};
pub use rule::{Rule, RuleLoadError, RuleSet, RuleWarning};
pub use scan::Scanner;
