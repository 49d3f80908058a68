//! Validation engine

use crate::backend::{decode, default_backend, DocumentTree, ParseError, TreeBackend};
use crate::condition::Matcher;
use crate::config::Config;
use crate::normalize::normalize;
use crate::report::{Report, ResultRow, Status};
use crate::rule::{Rule, RuleSet};
use crate::scan::{ScanError, Scanner};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Conditions that stop a run before any document is processed
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("No rules loaded")]
    NoRules,

    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// A rule with its query normalized and its condition compiled
#[derive(Debug)]
struct CompiledRule {
    rule: Rule,
    query: String,
    matcher: Matcher,
}

impl CompiledRule {
    fn new(rule: &Rule) -> Self {
        Self {
            rule: rule.clone(),
            query: normalize(&rule.path_expression),
            matcher: Matcher::for_rule(&rule.condition, &rule.expected),
        }
    }
}

/// The main validation engine
pub struct Engine {
    /// Configuration
    config: Config,

    /// Rules in load order
    rules: Vec<CompiledRule>,

    /// Parse and query collaborator
    backend: Arc<dyn TreeBackend>,
}

impl Engine {
    /// Create an engine. Refuses an empty rule set.
    pub fn new(
        config: Config,
        rules: &RuleSet,
        backend: Arc<dyn TreeBackend>,
    ) -> Result<Self, EngineError> {
        if rules.is_empty() {
            return Err(EngineError::NoRules);
        }
        for warning in rules.warnings(backend.as_ref()) {
            log::warn!("{}", warning);
        }
        Ok(Self {
            config,
            rules: rules.rules().iter().map(CompiledRule::new).collect(),
            backend,
        })
    }

    /// Create an engine using the backend selected at build time
    pub fn with_default_backend(config: Config, rules: &RuleSet) -> Result<Self, EngineError> {
        Self::new(config, rules, Arc::from(default_backend()))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Scanner for `root` built from the scan settings
    pub fn scanner(&self, root: &Path) -> Result<Scanner, ScanError> {
        Ok(Scanner::new(root)
            .with_extensions(&self.config.scan.extensions)
            .with_excludes(&self.config.scan.exclude)?
            .follow_links(self.config.scan.follow_links))
    }

    /// Validate every document under the configured root
    pub fn run(&self) -> Result<Report, EngineError> {
        self.run_on(&self.config.scan_root())
    }

    /// Validate every document under `root`
    pub fn run_on(&self, root: &Path) -> Result<Report, EngineError> {
        let scanner = self.scanner(root)?;
        let files: Vec<PathBuf> = scanner.scan().collect();
        log::info!(
            "Validating {} documents under {} with {} rules",
            files.len(),
            scanner.root().display(),
            self.rules.len()
        );
        Ok(self.validate_files(&scanner, &files))
    }

    /// Validate the given documents, reporting rows in the order given.
    /// The configured deadline counts from now.
    pub fn validate_files(&self, scanner: &Scanner, files: &[PathBuf]) -> Report {
        let deadline = self
            .config
            .engine
            .deadline_secs
            .map(|secs| Instant::now() + Duration::from_secs(secs));
        self.validate_files_until(scanner, files, deadline)
    }

    /// Validate the given documents, starting none after `deadline`.
    /// Documents already started finish; the rest count as skipped.
    pub fn validate_files_until(
        &self,
        scanner: &Scanner,
        files: &[PathBuf],
        deadline: Option<Instant>,
    ) -> Report {
        let start = Instant::now();
        let unit = |path: &PathBuf| -> Option<Vec<ResultRow>> {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return None;
            }
            Some(self.validate_document(path, scanner.relative(path)))
        };

        let results: Vec<Option<Vec<ResultRow>>> = match self.thread_pool() {
            Some(pool) => pool.install(|| files.par_iter().map(unit).collect()),
            None => files.iter().map(unit).collect(),
        };

        let mut report = Report::new(self.rules.len());
        for rows in results {
            match rows {
                Some(rows) => report.push_document(rows),
                None => report.documents_skipped += 1,
            }
        }
        report.duration = start.elapsed();

        if report.documents_skipped > 0 {
            log::warn!(
                "Deadline reached: {} documents not validated",
                report.documents_skipped
            );
        }
        log::info!(
            "Processed {} documents ({} rows) in {:.2?}",
            report.documents_processed,
            report.rows.len(),
            report.duration
        );

        report
    }

    fn thread_pool(&self) -> Option<rayon::ThreadPool> {
        if !self.config.engine.parallel {
            return None;
        }
        let threads = if self.config.engine.jobs > 0 {
            self.config.engine.jobs
        } else {
            num_cpus::get()
        };
        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => Some(pool),
            Err(e) => {
                log::warn!("Could not start thread pool, validating sequentially: {}", e);
                None
            }
        }
    }

    /// Validate one document read from disk
    pub fn validate_document(&self, path: &Path, relative: &Path) -> Vec<ResultRow> {
        let relative_path = relative.to_string_lossy().replace('\\', "/");
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        log::debug!("Processing: {}", relative_path);

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                let err = ParseError::from(e);
                return vec![ResultRow::parse_error(
                    &relative_path,
                    &file_name,
                    &err.to_string(),
                )];
            }
        };

        match decode(&bytes) {
            Ok(text) => self.validate_text(text, &relative_path, &file_name),
            Err(e) => vec![ResultRow::parse_error(
                &relative_path,
                &file_name,
                &e.to_string(),
            )],
        }
    }

    /// Validate document text. Produces one row per matched node, one row
    /// per rule without matches, or a single row if the text does not parse.
    pub fn validate_text(&self, text: &str, relative_path: &str, file_name: &str) -> Vec<ResultRow> {
        let tree = match self.backend.parse(text) {
            Ok(tree) => tree,
            Err(e) => {
                log::debug!("{}: {}", relative_path, e);
                return vec![ResultRow::parse_error(
                    relative_path,
                    file_name,
                    &e.to_string(),
                )];
            }
        };

        let mut rows = Vec::new();
        for compiled in &self.rules {
            self.apply_rule(tree.as_ref(), compiled, relative_path, file_name, &mut rows);
        }
        rows
    }

    fn apply_rule(
        &self,
        tree: &dyn DocumentTree,
        compiled: &CompiledRule,
        relative_path: &str,
        file_name: &str,
        rows: &mut Vec<ResultRow>,
    ) {
        let rule = &compiled.rule;
        let row = |actual: &str, status: Status| ResultRow {
            relative_path: relative_path.to_string(),
            file_name: file_name.to_string(),
            rule_id: rule.rule_id.clone(),
            description: rule.description.clone(),
            path_expression: compiled.query.clone(),
            expected: rule.expected.clone(),
            actual: actual.to_string(),
            status,
        };

        match tree.query(&compiled.query) {
            Err(e) => {
                log::debug!("{}: rule {}: {}", relative_path, rule.rule_id, e);
                rows.push(row("", Status::InvalidQuery));
            }
            Ok(texts) if texts.is_empty() => {
                let status = if rule.mandatory {
                    Status::Fail
                } else {
                    Status::Skip
                };
                rows.push(row("", status));
            }
            Ok(texts) => {
                for actual in texts {
                    let status = if compiled.matcher.matches(Some(&actual)) {
                        Status::Pass
                    } else {
                        Status::Fail
                    };
                    rows.push(row(&actual, status));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::QueryError;
    use crate::condition::Condition;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<AUTOSAR xmlns="http://autosar.org/schema/r4.0">
  <ADMIN-DATA>
    <SDGS>
      <SDG>
        <SD>1.0.0</SD>
      </SDG>
    </SDGS>
  </ADMIN-DATA>
  <AR-PACKAGES>
    <AR-PACKAGE><SHORT-NAME>ID_1</SHORT-NAME></AR-PACKAGE>
    <AR-PACKAGE><SHORT-NAME>pkg</SHORT-NAME></AR-PACKAGE>
  </AR-PACKAGES>
</AUTOSAR>"#;

    fn engine(rules: Vec<Rule>) -> Engine {
        let mut config = Config::default();
        config.engine.parallel = false;
        Engine::with_default_backend(config, &RuleSet::from_rules(rules)).unwrap()
    }

    #[test]
    fn test_no_rules() {
        let result = Engine::with_default_backend(Config::default(), &RuleSet::new());
        assert!(matches!(result, Err(EngineError::NoRules)));
    }

    #[test]
    fn test_one_row_per_match() {
        let engine = engine(vec![Rule::new(
            "R1",
            "/AUTOSAR/AR-PACKAGES/AR-PACKAGE/SHORT-NAME",
            Condition::Regex,
            "ID_[0-9]+$",
        )]);
        let rows = engine.validate_text(DOC, "a.arxml", "a.arxml");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].actual, "ID_1");
        assert_eq!(rows[0].status, Status::Pass);
        assert_eq!(rows[1].actual, "pkg");
        assert_eq!(rows[1].status, Status::Fail);
        assert!(rows[0].path_expression.contains("local-name()"));
    }

    #[test]
    fn test_no_match_mandatory_and_optional() {
        let engine = engine(vec![
            Rule::new("R1", "/AUTOSAR/MISSING", Condition::Exists, ""),
            Rule::new("R2", "/AUTOSAR/MISSING", Condition::Exists, "").optional(),
        ]);
        let rows = engine.validate_text(DOC, "a.arxml", "a.arxml");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status, Status::Fail);
        assert_eq!(rows[0].actual, "");
        assert_eq!(rows[1].status, Status::Skip);
    }

    #[test]
    fn test_parse_error_single_row() {
        let engine = engine(vec![
            Rule::new("R1", "/A", Condition::Exists, ""),
            Rule::new("R2", "/B", Condition::Exists, ""),
        ]);
        let rows = engine.validate_text("<A><B></A>", "bad.arxml", "bad.arxml");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, Status::ParseError);
        assert_eq!(rows[0].rule_id, "PARSE_ERROR");
        assert_eq!(rows[0].description, rows[0].actual);
        assert!(!rows[0].actual.is_empty());
    }

    #[test]
    fn test_invalid_query_row() {
        let engine = engine(vec![
            Rule::new("R1", "/AUTOSAR/", Condition::Exists, ""),
            Rule::new("R2", "/AUTOSAR/ADMIN-DATA/SDGS/SDG/SD", Condition::Equals, "1.0.0"),
        ]);
        let rows = engine.validate_text(DOC, "a.arxml", "a.arxml");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status, Status::InvalidQuery);
        assert_eq!(rows[0].actual, "");
        assert_eq!(rows[1].status, Status::Pass);
    }

    #[test]
    fn test_unrecognized_condition_fails() {
        let engine = engine(vec![Rule::new(
            "R1",
            "/AUTOSAR/ADMIN-DATA/SDGS/SDG/SD",
            "GREATER_THAN",
            "0",
        )]);
        let rows = engine.validate_text(DOC, "a.arxml", "a.arxml");
        assert_eq!(rows[0].status, Status::Fail);
        assert_eq!(rows[0].actual, "1.0.0");
    }

    #[test]
    fn test_row_fields() {
        let rule = Rule::new("R1", "/AUTOSAR/ADMIN-DATA/SDGS/SDG/SD", Condition::Equals, "1.0.0")
            .with_description("Schema version");
        let engine = engine(vec![rule]);
        let rows = engine.validate_text(DOC, "sub/a.arxml", "a.arxml");
        assert_eq!(rows[0].relative_path, "sub/a.arxml");
        assert_eq!(rows[0].file_name, "a.arxml");
        assert_eq!(rows[0].rule_id, "R1");
        assert_eq!(rows[0].description, "Schema version");
        assert_eq!(rows[0].expected, "1.0.0");
    }

    struct FailingBackend;

    struct FailingTree;

    impl DocumentTree for FailingTree {
        fn query(&self, expr: &str) -> Result<Vec<String>, QueryError> {
            Err(QueryError::Evaluation(expr.to_string()))
        }
    }

    impl TreeBackend for FailingBackend {
        fn name(&self) -> &str {
            "failing"
        }

        fn parse<'t>(&self, _text: &'t str) -> Result<Box<dyn DocumentTree + 't>, ParseError> {
            Ok(Box::new(FailingTree))
        }
    }

    /// Default backend that takes `delay` to parse each document
    struct SlowBackend {
        inner: Box<dyn TreeBackend>,
        delay: Duration,
    }

    impl TreeBackend for SlowBackend {
        fn name(&self) -> &str {
            "slow"
        }

        fn parse<'t>(&self, text: &'t str) -> Result<Box<dyn DocumentTree + 't>, ParseError> {
            std::thread::sleep(self.delay);
            self.inner.parse(text)
        }
    }

    fn write_documents(dir: &Path, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| {
                let path = dir.join(format!("doc{}.arxml", i));
                std::fs::write(&path, DOC).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn test_expired_deadline_skips_everything() {
        let dir = tempfile::TempDir::new().unwrap();
        let files = write_documents(dir.path(), 4);
        let engine = engine(vec![Rule::new("R1", "/AUTOSAR", Condition::Exists, "")]);
        let scanner = engine.scanner(dir.path()).unwrap();

        let report = engine.validate_files_until(&scanner, &files, Some(Instant::now()));
        assert_eq!(report.documents_skipped, files.len());
        assert_eq!(report.documents_processed, 0);
        assert!(report.rows.is_empty());
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_document_in_flight_finishes_after_deadline() {
        let dir = tempfile::TempDir::new().unwrap();
        let files = write_documents(dir.path(), 3);
        let mut config = Config::default();
        config.engine.parallel = false;
        let backend = SlowBackend {
            inner: default_backend(),
            delay: Duration::from_millis(400),
        };
        let rules = RuleSet::from_rules(vec![Rule::new("R1", "/AUTOSAR", Condition::Exists, "")]);
        let engine = Engine::new(config, &rules, Arc::new(backend)).unwrap();
        let scanner = engine.scanner(dir.path()).unwrap();

        let deadline = Instant::now() + Duration::from_millis(200);
        let report = engine.validate_files_until(&scanner, &files, Some(deadline));
        assert_eq!(report.documents_processed, 1);
        assert_eq!(report.documents_skipped, 2);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].relative_path, "doc0.arxml");
        assert_eq!(report.rows[0].status, Status::Pass);
    }

    #[test]
    fn test_no_deadline_processes_everything() {
        let dir = tempfile::TempDir::new().unwrap();
        let files = write_documents(dir.path(), 3);
        let engine = engine(vec![Rule::new("R1", "/AUTOSAR", Condition::Exists, "")]);
        let scanner = engine.scanner(dir.path()).unwrap();

        let report = engine.validate_files_until(&scanner, &files, None);
        assert_eq!(report.documents_processed, 3);
        assert_eq!(report.documents_skipped, 0);
        assert_eq!(report.rows.len(), 3);
    }

    #[test]
    fn test_backend_query_fault_is_invalid_query() {
        let rules = RuleSet::from_rules(vec![Rule::new("R1", "/A", Condition::Exists, "")]);
        let engine = Engine::new(Config::default(), &rules, Arc::new(FailingBackend)).unwrap();
        assert_eq!(engine.backend_name(), "failing");
        let rows = engine.validate_text("<A/>", "a", "a");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, Status::InvalidQuery);
    }
}
