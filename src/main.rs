//! lintpool - Parallel linting with a persistent result cache.
//!
//! Usage:
//!   lintpool [PATHS]...               Lint files, directories or globs
//!   lintpool --concurrency auto .     Lint in parallel
//!   lintpool --cache --fix src        Fix files, skipping unchanged ones
//!   lintpool --help                   Show help

mod rules;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use lintpool_core::{
    CacheStrategy, Concurrency, DeprecatedRuleUse, DispatchOptions, FileConfigResolver, FixMode,
    LintConfig, LintResult, Severity,
};
use lintpool_dispatch::{DispatchReport, Dispatcher, output_fixes};

use crate::rules::TextRules;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "LINTPOOL_LOG";

#[derive(Parser)]
#[command(
    name = "lintpool",
    version,
    about = "Lint text files in parallel",
    long_about = "lintpool checks files against line-oriented rules, spreading the work \
                  over a pool of workers.\n\n\
                  Rules are configured per directory with `.lintpool.toml` files; the \
                  nearest one applies."
)]
struct Cli {
    /// Files, directories or glob patterns to lint
    #[arg(default_value = ".")]
    paths: Vec<String>,

    /// Worker count: "off", "auto", or a number
    #[arg(long, default_value = "off")]
    concurrency: Concurrency,

    /// Only lint files that changed since the last run
    #[arg(long)]
    cache: bool,

    /// Cache file or directory
    #[arg(long, default_value = lintpool_core::DEFAULT_CACHE_FILE)]
    cache_location: PathBuf,

    /// How the cache detects changed files
    #[arg(long, default_value = "metadata")]
    cache_strategy: CacheStrategy,

    /// Fix problems automatically and write the files
    #[arg(long)]
    fix: bool,

    /// Fix problems without writing the files
    #[arg(long, conflicts_with = "fix")]
    fix_dry_run: bool,

    /// Don't warn about explicitly named files that are ignored
    #[arg(long)]
    no_warn_ignored: bool,

    /// Additional ignore glob, relative to the working directory
    #[arg(long = "ignore-pattern", value_name = "GLOB")]
    ignore_patterns: Vec<String>,

    /// Disable ignore patterns
    #[arg(long)]
    no_ignore: bool,

    /// File extensions to lint when walking directories
    #[arg(long = "ext", value_delimiter = ',', default_values_t = ["txt".to_string(), "md".to_string()])]
    extensions: Vec<String>,

    /// Base configuration file, overridden by `.lintpool.toml` files
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Succeed even when a pattern matches no files
    #[arg(long)]
    no_error_on_unmatched_pattern: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => Ok(code),
        Err(report) => {
            eprintln!("Error: {report:?}");
            Ok(ExitCode::from(2))
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Lint, print, and pick the exit code.
fn run(cli: Cli) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("Cannot determine working directory")?;
    let base = load_base_config(cli.config.as_deref())?;

    let fix = if cli.fix || cli.fix_dry_run {
        FixMode::All
    } else {
        FixMode::Off
    };

    let options = DispatchOptions::builder()
        .cwd(&cwd)
        .concurrency(cli.concurrency)
        .cache(cli.cache)
        .cache_location(cli.cache_location)
        .cache_strategy(cli.cache_strategy)
        .fix(fix)
        .warn_ignored(!cli.no_warn_ignored)
        .ignore_patterns(if cli.no_ignore {
            Vec::new()
        } else {
            cli.ignore_patterns
        })
        .extensions(cli.extensions)
        .error_on_unmatched_pattern(!cli.no_error_on_unmatched_pattern)
        .build()
        .context("Invalid options")?;

    let resolver = Arc::new(FileConfigResolver::new(base, Some(cwd.clone()))?);
    let dispatcher = Dispatcher::new(options, Arc::new(TextRules), resolver);
    let report = dispatcher.lint_patterns(cli.paths.as_slice()).context("Lint failed")?;

    if cli.fix {
        let written = output_fixes(&report.results).context("Failed to write fixes")?;
        tracing::debug!(written, "applied fixes");
    }

    match cli.format {
        OutputFormat::Text => print_text(&report, &cwd),
        OutputFormat::Json => print_json(&report)?,
    }

    if report.error_count() > 0 {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Built-in rules, overlaid with `--config` when given.
fn load_base_config(path: Option<&Path>) -> Result<LintConfig> {
    let defaults = rules::default_config();
    let Some(path) = path else {
        return Ok(defaults);
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read config {}", path.display()))?;
    let config = LintConfig::from_toml(path, &text)?;
    Ok(defaults.merged_with(&config))
}

/// Print results grouped by file.
fn print_text(report: &DispatchReport, cwd: &Path) {
    let mut deprecated: Vec<&DeprecatedRuleUse> = Vec::new();

    for result in &report.results {
        for used in result.used_deprecated_rules() {
            if !deprecated.iter().any(|d| d.rule_id == used.rule_id) {
                deprecated.push(used);
            }
        }

        if !result.has_messages() {
            continue;
        }

        println!();
        println!("{}", display_path(result, cwd));
        for message in &result.messages {
            let kind = if message.fatal {
                "fatal"
            } else {
                match message.severity {
                    Severity::Error => "error",
                    Severity::Warning => "warning",
                }
            };
            println!(
                "  {:>4}:{:<4} {:<8} {}  {}",
                message.line,
                message.column,
                kind,
                message.message,
                message.rule_id.as_deref().unwrap_or("")
            );
        }
    }

    let errors = report.error_count();
    let warnings = report.warning_count();
    let total = errors + warnings;

    if total > 0 {
        println!();
        println!(
            "{} problem{} ({} error{}, {} warning{})",
            total,
            plural(total),
            errors,
            plural(errors),
            warnings,
            plural(warnings)
        );

        let fixable: usize = report
            .results
            .iter()
            .map(|r| r.fixable_error_count + r.fixable_warning_count)
            .sum();
        if fixable > 0 {
            println!("  {fixable} potentially fixable with the `--fix` option.");
        }
    }

    for used in deprecated {
        if used.replaced_by.is_empty() {
            eprintln!("Rule \"{}\" is deprecated.", used.rule_id);
        } else {
            eprintln!(
                "Rule \"{}\" is deprecated; use {} instead.",
                used.rule_id,
                used.replaced_by.join(", ")
            );
        }
    }

    eprintln!(
        "Linted {} file{} with {} worker{} in {:.2}s ({} from cache)",
        report.results.len(),
        plural(report.results.len()),
        report.worker_count,
        plural(report.worker_count),
        report.duration.as_secs_f64(),
        report.stats.cache_hits
    );
}

#[derive(Serialize)]
struct JsonResult<'a> {
    #[serde(flatten)]
    result: &'a LintResult,
    used_deprecated_rules: &'a [DeprecatedRuleUse],
}

fn print_json(report: &DispatchReport) -> Result<()> {
    let results: Vec<JsonResult<'_>> = report
        .results
        .iter()
        .map(|result| JsonResult {
            result,
            used_deprecated_rules: result.used_deprecated_rules(),
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn display_path(result: &LintResult, cwd: &Path) -> String {
    result
        .path()
        .strip_prefix(cwd)
        .unwrap_or(result.path())
        .display()
        .to_string()
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}
