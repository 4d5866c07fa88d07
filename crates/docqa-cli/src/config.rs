//! Configuration file support for docqa.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/docqa/config.toml` (lowest priority)
//! - Project-local: `.docqa.toml` (searched up directory tree)
//! - CLI flags (highest priority, applied separately)

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

/// Name of the project-local config file.
pub const PROJECT_FILE: &str = ".docqa.toml";

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General options.
    pub general: GeneralConfig,
    /// Profile and SLA selection.
    pub analysis: AnalysisConfig,
    /// Output formatting settings.
    pub output: OutputConfig,
}

/// General configuration options.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Recurse into subdirectories by default.
    pub recursive: Option<bool>,
    /// Maximum number of images analyzed at once.
    pub workers: Option<usize>,
    /// Per-image analysis timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Memory available for decoded images, in MiB.
    pub memory_budget_mb: Option<u64>,
}

/// Profile selection.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Built-in profile name.
    pub profile: Option<String>,
    /// Profile overrides file. Relative paths resolve against the config
    /// file's directory.
    pub profile_file: Option<PathBuf>,
    /// Whether to evaluate the SLA.
    pub sla: Option<bool>,
}

/// Output formatting configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "json" or "jsonl".
    pub format: Option<String>,
    /// Pretty-print JSON output.
    pub pretty: Option<bool>,
    /// Show progress bar.
    pub progress: Option<bool>,
    /// Append a batch summary line to JSONL output.
    pub summary: Option<bool>,
}

impl AppConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Priority (lowest to highest):
    /// 1. XDG config: `~/.config/docqa/config.toml`
    /// 2. Project-local: `.docqa.toml` (searched up from cwd)
    ///
    /// Missing files are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read or
    /// parsed, or if the merged values are out of range.
    pub fn load() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        Self::load_from(xdg_config_path().as_deref(), &cwd)
    }

    /// Loads the XDG file at `xdg` and the project file found from `start`.
    ///
    /// # Errors
    ///
    /// As [`AppConfig::load`].
    pub fn load_from(xdg: Option<&Path>, start: &Path) -> Result<Self> {
        let mut config = Self::default();

        if let Some(xdg_path) = xdg {
            if xdg_path.exists() {
                info!(path = %xdg_path.display(), "loading XDG config");
                config = load_file(xdg_path)?;
            } else {
                debug!(path = %xdg_path.display(), "XDG config not found");
            }
        }

        if let Some(project_path) = find_config_in_parents(start) {
            info!(path = %project_path.display(), "loading project config");
            config.merge(load_file(&project_path)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values are within acceptable ranges.
    fn validate(&self) -> Result<()> {
        if self.general.workers == Some(0) {
            bail!("general.workers must be at least 1");
        }
        if self.general.timeout_secs == Some(0) {
            bail!("general.timeout_secs must be at least 1");
        }
        if let Some(ref f) = self.output.format {
            if f != "json" && f != "jsonl" {
                bail!("output.format must be 'json' or 'jsonl', got '{f}'");
            }
        }
        Ok(())
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    fn merge(&mut self, other: Self) {
        // General
        self.general.recursive = other.general.recursive.or(self.general.recursive);
        self.general.workers = other.general.workers.or(self.general.workers);
        self.general.timeout_secs = other.general.timeout_secs.or(self.general.timeout_secs);
        self.general.memory_budget_mb = other
            .general
            .memory_budget_mb
            .or(self.general.memory_budget_mb);

        // Analysis
        self.analysis.profile = other
            .analysis
            .profile
            .or_else(|| self.analysis.profile.take());
        self.analysis.profile_file = other
            .analysis
            .profile_file
            .or_else(|| self.analysis.profile_file.take());
        self.analysis.sla = other.analysis.sla.or(self.analysis.sla);

        // Output
        self.output.format = other.output.format.or_else(|| self.output.format.take());
        self.output.pretty = other.output.pretty.or(self.output.pretty);
        self.output.progress = other.output.progress.or(self.output.progress);
        self.output.summary = other.output.summary.or(self.output.summary);
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("docqa").join("config.toml"))
}

/// Search for `.docqa.toml` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let config_path = dir.join(PROJECT_FILE);
        if config_path.exists() {
            return Some(config_path);
        }
        current = dir.parent();
    }

    None
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let mut config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;

    if let (Some(file), Some(dir)) = (&config.analysis.profile_file, path.parent()) {
        if file.is_relative() {
            config.analysis.profile_file = Some(dir.join(file));
        }
    }
    Ok(config)
}
