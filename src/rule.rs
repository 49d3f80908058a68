//! Rule definitions and rule file loading

use crate::backend::TreeBackend;
use crate::condition::{compile_anchored, Condition, RuleCondition};
use crate::normalize::normalize;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error loading rules
#[derive(Debug, Error)]
pub enum RuleLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error in {file}: {message}")]
    Parse { file: String, message: String },

    #[error("Rules path not found: {0}")]
    NotFound(PathBuf),

    #[error("Unsupported rule file format: {0}")]
    UnsupportedFormat(String),
}

/// A structural check applied to every document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule identifier; duplicates are allowed
    #[serde(default = "default_rule_id", alias = "id")]
    pub rule_id: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Path expression selecting the nodes to check
    #[serde(
        default,
        rename = "xpath",
        alias = "path",
        alias = "path_expression"
    )]
    pub path_expression: String,

    /// Comparison applied to each matched node
    #[serde(default)]
    pub condition: RuleCondition,

    /// Expected value; numbers and booleans are read as text
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub expected: String,

    /// Whether zero matches is a failure (true) or a skip (false)
    #[serde(default = "default_true")]
    pub mandatory: bool,
}

fn default_rule_id() -> String {
    "UNKNOWN".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

fn deserialize_scalar<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Scalar> = Option::deserialize(deserializer)?;
    Ok(match value {
        None => String::new(),
        Some(Scalar::Str(s)) => s,
        Some(Scalar::Bool(b)) => b.to_string(),
        Some(Scalar::Int(i)) => i.to_string(),
        Some(Scalar::Float(f)) if f.is_finite() && f.fract() == 0.0 => format!("{:.1}", f),
        Some(Scalar::Float(f)) => f.to_string(),
    })
}

impl Rule {
    /// Create a mandatory rule
    pub fn new(
        rule_id: &str,
        path_expression: &str,
        condition: impl Into<RuleCondition>,
        expected: &str,
    ) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            description: String::new(),
            path_expression: path_expression.to_string(),
            condition: condition.into(),
            expected: expected.to_string(),
            mandatory: true,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Mark the rule as optional: zero matches yields a skip
    pub fn optional(mut self) -> Self {
        self.mandatory = false;
        self
    }

    /// Sanity checks that never reject the rule. The normalized path is
    /// compiled by `backend`.
    pub fn check(&self, backend: &dyn TreeBackend) -> Vec<String> {
        let mut problems = Vec::new();

        if self.path_expression.trim().is_empty() {
            problems.push("empty path expression".to_string());
        } else if let Err(e) = backend.check_query(&normalize(&self.path_expression)) {
            problems.push(format!("path expression will not compile: {}", e));
        }

        match self.condition.known() {
            None => problems.push(format!(
                "unrecognized condition '{}' (expected one of {}); rule always fails",
                self.condition,
                Condition::ALL
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            Some(Condition::Regex) => {
                if let Err(e) = compile_anchored(&self.expected) {
                    problems.push(format!("invalid regular expression: {}", e));
                }
            }
            Some(_) => {}
        }

        problems
    }
}

/// A load-time finding about one rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleWarning {
    pub rule_id: String,
    pub message: String,
}

impl fmt::Display for RuleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule {}: {}", self.rule_id, self.message)
    }
}

/// On-disk rule file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleFile {
    /// Rule file format version
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl RuleFile {
    /// Read a rule file, choosing the format by extension
    pub fn load(path: &Path) -> Result<Self, RuleLoadError> {
        let content = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        let file = path.display().to_string();

        match ext.as_str() {
            "yaml" | "yml" => {
                serde_yaml::from_str(&content).map_err(|e| RuleLoadError::Parse {
                    file,
                    message: e.to_string(),
                })
            }
            "json" => serde_json::from_str(&content).map_err(|e| RuleLoadError::Parse {
                file,
                message: e.to_string(),
            }),
            _ => Err(RuleLoadError::UnsupportedFormat(file)),
        }
    }
}

fn is_rule_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref(),
        Some("yaml" | "yml" | "json")
    )
}

/// Ordered rules plus the files they came from
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    sources: Vec<PathBuf>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a rule set from in-memory rules
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            sources: Vec::new(),
        }
    }

    /// Load a rule file, or every rule file of a directory in name order
    pub fn load(path: &Path) -> Result<Self, RuleLoadError> {
        if !path.exists() {
            return Err(RuleLoadError::NotFound(path.to_path_buf()));
        }

        let mut set = Self::new();
        if path.is_dir() {
            let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file() && is_rule_file(p))
                .collect();
            files.sort();
            for file in files {
                set.add_file(&file)?;
            }
        } else {
            set.add_file(path)?;
        }

        log::info!(
            "Loaded {} rules from {} file(s)",
            set.rules.len(),
            set.sources.len()
        );

        Ok(set)
    }

    /// Append the rules of one file
    pub fn add_file(&mut self, path: &Path) -> Result<usize, RuleLoadError> {
        let file = RuleFile::load(path)?;
        let count = file.rules.len();
        log::debug!("{}: {} rules", path.display(), count);
        self.rules.extend(file.rules);
        self.sources.push(path.to_path_buf());
        Ok(count)
    }

    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Keep only the rules matching `keep`
    pub fn retain<F: FnMut(&Rule) -> bool>(&mut self, keep: F) {
        let before = self.rules.len();
        self.rules.retain(keep);
        let dropped = before - self.rules.len();
        if dropped > 0 {
            log::info!("Filtered out {} rules", dropped);
        }
    }

    /// Load-time findings: per-rule checks plus duplicate ids
    pub fn warnings(&self, backend: &dyn TreeBackend) -> Vec<RuleWarning> {
        let mut warnings = Vec::new();
        let mut seen: HashMap<&str, usize> = HashMap::new();

        for rule in &self.rules {
            for message in rule.check(backend) {
                warnings.push(RuleWarning {
                    rule_id: rule.rule_id.clone(),
                    message,
                });
            }
            *seen.entry(rule.rule_id.as_str()).or_default() += 1;
        }

        let mut duplicates: Vec<_> = seen.into_iter().filter(|(_, n)| *n > 1).collect();
        duplicates.sort();
        for (id, n) in duplicates {
            warnings.push(RuleWarning {
                rule_id: id.to_string(),
                message: format!("id used by {} rules; each produces its own rows", n),
            });
        }

        warnings
    }
}
