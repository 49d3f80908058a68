//! Condition evaluation
//!
//! A rule compares the trimmed text of every matched node against its
//! `expected` value using one of a closed set of conditions.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Comparison applied to a matched node's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// Exact, case-sensitive equality
    Equals,
    /// Negation of `Equals`
    NotEquals,
    /// Text is present and non-empty; `expected` is ignored
    Exists,
    /// Text equals one of the comma-separated values of `expected`
    In,
    /// `expected` is a pattern matched from the start of the text
    Regex,
}

impl Condition {
    pub const ALL: [Condition; 5] = [
        Condition::Equals,
        Condition::NotEquals,
        Condition::Exists,
        Condition::In,
        Condition::Regex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Equals => "EQUALS",
            Condition::NotEquals => "NOT_EQUALS",
            Condition::Exists => "EXISTS",
            Condition::In => "IN",
            Condition::Regex => "REGEX",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "EQUALS" => Ok(Condition::Equals),
            "NOT_EQUALS" => Ok(Condition::NotEquals),
            "EXISTS" => Ok(Condition::Exists),
            "IN" => Ok(Condition::In),
            "REGEX" => Ok(Condition::Regex),
            _ => Err(format!("Unknown condition: {}", s)),
        }
    }
}

/// Condition as read from a rule file.
///
/// Rule files are external data, so a condition name nobody recognizes is
/// kept instead of rejected. Such a rule can never be satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleCondition {
    Known(Condition),
    Unrecognized(String),
}

impl RuleCondition {
    pub fn known(&self) -> Option<Condition> {
        match self {
            RuleCondition::Known(c) => Some(*c),
            RuleCondition::Unrecognized(_) => None,
        }
    }
}

impl Default for RuleCondition {
    fn default() -> Self {
        RuleCondition::Unrecognized(String::new())
    }
}

impl From<Condition> for RuleCondition {
    fn from(c: Condition) -> Self {
        RuleCondition::Known(c)
    }
}

impl From<&str> for RuleCondition {
    fn from(s: &str) -> Self {
        match s.parse::<Condition>() {
            Ok(c) => RuleCondition::Known(c),
            Err(_) => RuleCondition::Unrecognized(s.to_string()),
        }
    }
}

impl fmt::Display for RuleCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleCondition::Known(c) => c.fmt(f),
            RuleCondition::Unrecognized(s) => f.write_str(s),
        }
    }
}

impl Serialize for RuleCondition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RuleCondition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(RuleCondition::from(s.as_str()))
    }
}

/// A condition compiled together with its expected value.
///
/// Built once per rule so the regex and the IN list are not rebuilt for
/// every matched node.
#[derive(Debug, Clone)]
pub enum Matcher {
    Equals(String),
    NotEquals(String),
    Exists,
    In(Vec<String>),
    Regex(Regex),
    /// Unrecognized condition or a pattern that does not compile
    Never,
}

impl Matcher {
    pub fn new(condition: Condition, expected: &str) -> Self {
        match condition {
            Condition::Equals => Matcher::Equals(expected.to_string()),
            Condition::NotEquals => Matcher::NotEquals(expected.to_string()),
            Condition::Exists => Matcher::Exists,
            Condition::In => Matcher::In(split_list(expected)),
            Condition::Regex => match compile_anchored(expected) {
                Ok(re) => Matcher::Regex(re),
                Err(e) => {
                    log::debug!("pattern {:?} does not compile: {}", expected, e);
                    Matcher::Never
                }
            },
        }
    }

    pub fn for_rule(condition: &RuleCondition, expected: &str) -> Self {
        match condition {
            RuleCondition::Known(c) => Self::new(*c, expected),
            RuleCondition::Unrecognized(_) => Matcher::Never,
        }
    }

    pub fn matches(&self, actual: Option<&str>) -> bool {
        match self {
            Matcher::Equals(expected) => actual == Some(expected.as_str()),
            Matcher::NotEquals(expected) => actual != Some(expected.as_str()),
            Matcher::Exists => actual.is_some_and(|a| !a.is_empty()),
            Matcher::In(values) => actual.is_some_and(|a| values.iter().any(|v| v == a)),
            Matcher::Regex(re) => re.is_match(actual.unwrap_or("")),
            Matcher::Never => false,
        }
    }
}

/// Evaluate a single comparison.
pub fn evaluate(actual: Option<&str>, expected: &str, condition: Condition) -> bool {
    Matcher::new(condition, expected).matches(actual)
}

/// Compile `pattern` so it only matches at the start of the input.
pub fn compile_anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})", pattern))
}

fn split_list(expected: &str) -> Vec<String> {
    expected.split(',').map(|v| v.trim().to_string()).collect()
}
