//! CLI command definitions and handlers.

pub mod check;
pub mod profiles;

use clap::{Parser, Subcommand};

/// docqa - technical quality analysis for document photos and scans
#[derive(Parser)]
#[command(name = "docqa")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Shared check arguments (paths, profile, output flags).
    #[command(flatten)]
    pub check: check::CheckArgs,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Analyze document images
    Check(check::CheckArgs),
    /// Inspect the built-in profiles
    Profiles(profiles::ProfilesArgs),
}

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Every analyzed image passed.
    Success = 0,
    /// Some image warned, failed or could not be loaded.
    QualityIssues = 1,
    /// Usage or configuration error.
    Error = 2,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code as u8)
    }
}
