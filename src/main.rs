//! arxcheck CLI - validate XML/ARXML documents against declarative rules

use anyhow::Context;
use arxcheck::backend::{default_backend, TreeBackend};
use arxcheck::config::{CliOverrides, ColorMode, Config, OutputFormat};
use arxcheck::engine::{Engine, EngineError};
use arxcheck::normalize::normalize;
use arxcheck::output::formatter_for;
use arxcheck::rule::RuleSet;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;

/// Exit code for runs that could not produce a report
const EXIT_FATAL: i32 = 3;

#[derive(Parser)]
#[command(
    name = "arxcheck",
    version,
    about = "Rule-driven validator for XML and ARXML documents",
    long_about = "Applies path/condition/expected rules to every document under a directory \
                  and reports one PASS/FAIL/SKIP row per matched node."
)]
struct Cli {
    /// Directory to scan (default: configured root or current directory)
    root: Option<PathBuf>,

    /// Rule file or directory of rule files
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<Format>,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Validate documents one at a time
    #[arg(long)]
    sequential: bool,

    /// Document extensions to scan (comma-separated)
    #[arg(long, value_delimiter = ',')]
    ext: Option<Vec<String>>,

    /// Glob patterns of paths to skip, relative to the root (comma-separated)
    #[arg(long, value_delimiter = ',')]
    exclude: Option<Vec<String>>,

    /// Stop starting new documents after this many seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    deadline: Option<u64>,

    /// Disable specific rules (comma-separated)
    #[arg(long, value_delimiter = ',')]
    disable: Option<Vec<String>>,

    /// Only enable specific rules (comma-separated)
    #[arg(long, value_delimiter = ',')]
    select: Option<Vec<String>>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Exit with 0 even if checks fail
    #[arg(long)]
    exit_zero: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List loaded rules with their normalized paths and load warnings
    Rules,
    /// Print the namespace-agnostic form of a path expression
    Normalize {
        /// Path expression to rewrite
        expr: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    Csv,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::Csv => OutputFormat::Csv,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load_default().context("Failed to load config")?,
    };

    config.merge_cli(CliOverrides {
        root: cli.root.clone(),
        rules: cli.rules.clone(),
        format: cli.format.map(OutputFormat::from),
        output: cli.output.clone(),
        jobs: cli.jobs,
        sequential: cli.sequential,
        extensions: cli.ext.clone(),
        exclude: cli.exclude.clone(),
        deadline_secs: cli.deadline,
        disabled_rules: cli.disable.clone(),
        enabled_rules: cli.select.clone(),
        no_color: cli.no_color,
    });

    Ok(config)
}

fn load_rules(config: &Config) -> anyhow::Result<RuleSet> {
    let path = config.rules_path();
    let mut rules = RuleSet::load(&path)
        .with_context(|| format!("Failed to load rules from {}", path.display()))?;
    rules.retain(|r| config.is_rule_enabled(&r.rule_id));
    Ok(rules)
}

/// Print the rule list for the `rules` subcommand
fn list_rules(rules: &RuleSet, backend: &dyn TreeBackend) {
    for source in rules.sources() {
        println!("{} {}", "Source:".bold(), source.display());
    }
    println!();

    for rule in rules.rules() {
        let flag = if rule.mandatory {
            "mandatory".normal()
        } else {
            "optional".dimmed()
        };
        println!(
            "  {} [{}] ({})",
            rule.rule_id.cyan(),
            rule.condition,
            flag
        );
        if !rule.description.is_empty() {
            println!("      {}", rule.description);
        }
        println!("      {}", normalize(&rule.path_expression));
        if !rule.expected.is_empty() {
            println!("      expected: {}", rule.expected);
        }
    }

    let warnings = rules.warnings(backend);
    if !warnings.is_empty() {
        println!();
        for warning in &warnings {
            println!("{}: {}", "warning".yellow(), warning);
        }
    }

    println!();
    println!("{} rules", rules.len());
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    if let Some(Commands::Normalize { expr }) = &cli.command {
        println!("{}", normalize(expr));
        return Ok(0);
    }

    let config = load_config(&cli)?;

    let colored = match config.output.color {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => config.output.file.is_none() && std::io::stdout().is_terminal(),
    };
    colored::control::set_override(colored);

    let rules = load_rules(&config)?;

    if let Some(Commands::Rules) = &cli.command {
        list_rules(&rules, default_backend().as_ref());
        return Ok(0);
    }

    let engine = match Engine::with_default_backend(config.clone(), &rules) {
        Ok(engine) => engine,
        Err(EngineError::NoRules) => anyhow::bail!(
            "No rules loaded from {}",
            config.rules_path().display()
        ),
        Err(e) => return Err(e.into()),
    };
    log::info!("Using {} backend", engine.backend_name());

    let report = engine.run()?;

    let output = formatter_for(config.output.format, colored).format(&report);
    match &config.output.file {
        Some(path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            eprintln!("Report written to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(output.as_bytes())?;
            if !output.ends_with('\n') {
                writeln!(stdout)?;
            }
            stdout.flush()?;
        }
    }

    if cli.exit_zero {
        Ok(0)
    } else {
        Ok(report.exit_code())
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            std::process::exit(EXIT_FATAL);
        }
    }
}
