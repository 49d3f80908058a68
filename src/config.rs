//! Configuration for validation runs
//!
//! Reads configuration from:
//! - `.arxcheck.yaml` / `.arxcheck.yml` / `.arxcheck.json` / `arxcheck.yaml`
//!   in the current directory (project-level)
//! - the same names in the home directory (user-level)
//! - an explicit path given on the command line

use crate::scan::DEFAULT_EXTENSION;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Rules file used when neither the command line nor a config names one
pub const DEFAULT_RULES_PATH: &str = "rules/rules.json";

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Document discovery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory to scan (defaults to the current directory)
    pub root: Option<PathBuf>,

    /// Accepted file extensions, compared case-insensitively
    pub extensions: Vec<String>,

    /// Glob patterns, relative to the root, of paths to skip
    pub exclude: Vec<String>,

    /// Follow symbolic links while walking
    pub follow_links: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: None,
            extensions: vec![DEFAULT_EXTENSION.to_string()],
            exclude: Vec::new(),
            follow_links: false,
        }
    }
}

/// Rule selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Rule file or directory of rule files
    pub path: Option<PathBuf>,

    /// Disabled rules
    pub disabled: Vec<String>,

    /// Enabled rules (empty = all)
    pub enabled: Vec<String>,
}

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Validate documents on a thread pool
    pub parallel: bool,

    /// Number of parallel jobs (0 = auto-detect)
    pub jobs: usize,

    /// Stop starting new documents after this many seconds
    pub deadline_secs: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            jobs: 0,
            deadline_secs: None,
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Color mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// Output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format
    pub format: OutputFormat,

    /// Write the report here instead of stdout
    pub file: Option<PathBuf>,

    /// Color mode
    pub color: ColorMode,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub rules: RulesConfig,
    pub engine: EngineConfig,
    pub output: OutputConfig,
}

/// Command-line values that take precedence over configuration files
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root: Option<PathBuf>,
    pub rules: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub output: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub sequential: bool,
    pub extensions: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub deadline_secs: Option<u64>,
    pub disabled_rules: Option<Vec<String>>,
    pub enabled_rules: Option<Vec<String>>,
    pub no_color: bool,
}

impl Config {
    /// Create default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config: Self = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown config file format: {}",
                    ext
                )))
            }
        };

        config.validate()?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load from default locations
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_names = [
            ".arxcheck.yaml",
            ".arxcheck.yml",
            ".arxcheck.json",
            "arxcheck.yaml",
        ];

        // Check current directory
        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Self::load(&path);
            }
        }

        // Check home directory
        if let Some(home) = dirs::home_dir() {
            for name in &config_names {
                let path = home.join(name);
                if path.exists() {
                    return Self::load(&path);
                }
            }
        }

        Ok(Self::default())
    }

    /// Reject values no run could use
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "scan.extensions must name at least one extension".to_string(),
            ));
        }
        if self.engine.deadline_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "engine.deadline_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Merge CLI arguments into configuration
    pub fn merge_cli(&mut self, cli: CliOverrides) {
        if let Some(root) = cli.root {
            self.scan.root = Some(root);
        }
        if let Some(rules) = cli.rules {
            self.rules.path = Some(rules);
        }
        if let Some(f) = cli.format {
            self.output.format = f;
        }
        if let Some(file) = cli.output {
            self.output.file = Some(file);
        }
        if let Some(j) = cli.jobs {
            self.engine.jobs = j;
        }
        if cli.sequential {
            self.engine.parallel = false;
        }
        if let Some(ext) = cli.extensions {
            self.scan.extensions = ext;
        }
        if let Some(exclude) = cli.exclude {
            self.scan.exclude.extend(exclude);
        }
        if let Some(secs) = cli.deadline_secs {
            self.engine.deadline_secs = Some(secs);
        }
        if let Some(disabled) = cli.disabled_rules {
            self.rules.disabled.extend(disabled);
        }
        if let Some(enabled) = cli.enabled_rules {
            self.rules.enabled = enabled;
        }
        if cli.no_color {
            self.output.color = ColorMode::Never;
        }
    }

    /// Directory to scan
    pub fn scan_root(&self) -> PathBuf {
        self.scan.root.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Rule file or directory to load
    pub fn rules_path(&self) -> PathBuf {
        self.rules
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RULES_PATH))
    }

    /// Check if a rule is enabled
    pub fn is_rule_enabled(&self, rule_id: &str) -> bool {
        if self.rules.disabled.iter().any(|r| r == rule_id) {
            return false;
        }
        self.rules.enabled.is_empty() || self.rules.enabled.iter().any(|r| r == rule_id)
    }
}
