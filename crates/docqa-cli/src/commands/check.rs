//! Check command - analyze document images.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use docqa_adapters::{profiles, FsImageSource};
use docqa_core::{Analyzer, BatchOptions, BatchProcessor, BatchReport, ImageSource, Status};
use tracing::{debug, info};

use super::ExitCode;
use crate::config::AppConfig;
use crate::output::{JsonOutput, ProgressBar};

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON Lines (one JSON object per line)
    #[default]
    Jsonl,
    /// Single JSON batch report
    Json,
}

const BYTES_PER_MIB: u64 = 1024 * 1024;

/// Parse a count that must be at least 1.
fn parse_positive(s: &str) -> Result<u64, String> {
    let value: u64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value == 0 {
        Err("must be at least 1".into())
    } else {
        Ok(value)
    }
}

/// Shared arguments for image analysis.
#[derive(Args, Clone, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct CheckArgs {
    /// Files or directories to analyze
    pub paths: Vec<PathBuf>,

    /// Recurse into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Built-in profile name (see `docqa profiles list`)
    #[arg(long, value_name = "NAME")]
    pub profile: Option<String>,

    /// TOML file with profile overrides
    #[arg(long, value_name = "FILE")]
    pub profile_file: Option<PathBuf>,

    /// Evaluate SLA compliance
    #[arg(long, conflicts_with = "no_sla")]
    pub sla: bool,

    /// Skip SLA compliance evaluation
    #[arg(long)]
    pub no_sla: bool,

    /// Maximum number of images analyzed at once
    #[arg(long, value_parser = parse_positive, value_name = "N")]
    pub workers: Option<u64>,

    /// Per-image analysis timeout in seconds
    #[arg(long, value_parser = parse_positive, value_name = "S")]
    pub timeout_secs: Option<u64>,

    /// Memory available for decoded images, in MiB
    #[arg(long, value_parser = parse_positive, value_name = "MIB")]
    pub memory_budget_mb: Option<u64>,

    /// Show progress bar
    #[arg(long)]
    pub progress: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pretty-print JSON output (only affects --format json)
    #[arg(long)]
    pub pretty: bool,

    /// Append a batch summary line to JSONL output
    #[arg(long)]
    pub summary: bool,
}

impl CheckArgs {
    /// Apply configuration file values, respecting CLI precedence.
    ///
    /// Layering priority (lowest to highest):
    /// 1. Hardcoded defaults (in accessor methods)
    /// 2. Config file values (XDG, then project-local)
    /// 3. CLI arguments (already set on self)
    #[must_use]
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        if !args.recursive {
            args.recursive = config.general.recursive.unwrap_or(false);
        }

        // A CLI profile name also drops a configured overrides file, and the
        // other way around, so the pair never mixes layers.
        if args.profile.is_none() && args.profile_file.is_none() {
            args.profile.clone_from(&config.analysis.profile);
            args.profile_file.clone_from(&config.analysis.profile_file);
        }

        if !args.sla && !args.no_sla {
            match config.analysis.sla {
                Some(true) => args.sla = true,
                Some(false) => args.no_sla = true,
                None => {}
            }
        }

        args.workers = args
            .workers
            .or_else(|| config.general.workers.and_then(|w| u64::try_from(w).ok()));
        args.timeout_secs = args.timeout_secs.or(config.general.timeout_secs);
        args.memory_budget_mb = args.memory_budget_mb.or(config.general.memory_budget_mb);

        if args.format.is_none() {
            args.format = config
                .output
                .format
                .as_ref()
                .and_then(|s| match s.as_str() {
                    "json" => Some(OutputFormat::Json),
                    "jsonl" => Some(OutputFormat::Jsonl),
                    _ => None,
                });
        }
        if !args.pretty {
            args.pretty = config.output.pretty.unwrap_or(false);
        }
        if !args.progress {
            args.progress = config.output.progress.unwrap_or(false);
        }
        if !args.summary {
            args.summary = config.output.summary.unwrap_or(false);
        }

        args
    }

    /// SLA switch from flags; `None` keeps the profile's setting.
    const fn sla_override(&self) -> Option<bool> {
        if self.no_sla {
            Some(false)
        } else if self.sla {
            Some(true)
        } else {
            None
        }
    }

    /// Get output format with fallback to JSONL.
    fn format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }

    fn batch_options(&self) -> BatchOptions {
        let defaults = BatchOptions::default();
        BatchOptions {
            max_workers: self
                .workers
                .and_then(|w| usize::try_from(w).ok())
                .unwrap_or(defaults.max_workers),
            memory_budget_bytes: self
                .memory_budget_mb
                .map(|mb| mb.saturating_mul(BYTES_PER_MIB)),
            timeout: self.timeout_secs.map(Duration::from_secs),
            ..defaults
        }
    }
}

/// Result of running the check command.
#[allow(dead_code)] // Fields exposed for programmatic use
pub struct CheckResult {
    /// Number of images analyzed.
    pub processed: usize,
    /// Number of images that produced no result.
    pub failed: usize,
    /// Number of analyzed images without a global PASS.
    pub with_issues: usize,
    /// Exit code.
    pub exit_code: ExitCode,
}

/// Run the check command.
///
/// Expects `args` to have been processed through `with_config()` first
/// to apply configuration file settings.
///
/// # Errors
///
/// Returns an error if the profile cannot be resolved or output fails.
pub fn run(args: &CheckArgs) -> Result<CheckResult> {
    info!(paths = args.paths.len(), "running check command");

    if args.paths.is_empty() {
        anyhow::bail!("No paths specified");
    }

    let profile = profiles::resolve(args.profile.as_deref(), args.profile_file.as_deref())
        .context("Failed to load profile")?;
    let mut analyzer = Analyzer::new(profile)?;
    if let Some(enabled) = args.sla_override() {
        analyzer = analyzer.with_sla(enabled);
    }
    debug!(profile = %analyzer.profile().name, sla = analyzer.sla().enabled(), "analyzer built");

    let source = FsImageSource::new(args.paths.clone(), args.recursive);
    let total = source.count_hint();

    // Determine if we should show progress
    let show_progress = !args.quiet && (args.progress || std::io::stderr().is_terminal());
    let progress_bar = ProgressBar::new(
        total.and_then(|t| u64::try_from(t).ok()),
        args.quiet,
        show_progress,
    );

    let report = BatchProcessor::new(analyzer, args.batch_options()).run(&source, &progress_bar);

    write_report(&report, args)?;

    let with_issues = report
        .results
        .iter()
        .filter(|r| r.global.status != Status::Pass)
        .count();
    let exit_code = if with_issues > 0 || !report.failures.is_empty() {
        ExitCode::QualityIssues
    } else {
        ExitCode::Success
    };

    Ok(CheckResult {
        processed: report.results.len(),
        failed: report.failures.len(),
        with_issues,
        exit_code,
    })
}

fn write_report(report: &BatchReport, args: &CheckArgs) -> Result<()> {
    use docqa_core::ResultOutput;

    let output = JsonOutput::stdout();
    match args.format() {
        OutputFormat::Jsonl => {
            report.write_to(&output)?;
            if args.summary {
                output.write_summary(report)?;
                output.flush()?;
            }
            Ok(())
        }
        OutputFormat::Json => {
            output.write_report(report, args.pretty)?;
            output.flush()
        }
    }
}
