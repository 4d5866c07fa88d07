//! Profiles command - list and show built-in profiles.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use docqa_adapters::profiles;
use docqa_core::ConfigurationProfile;

/// Arguments for the profiles command.
#[derive(Args)]
pub struct ProfilesArgs {
    #[command(subcommand)]
    pub command: ProfilesCommand,
}

/// Profiles subcommands.
#[derive(Subcommand)]
pub enum ProfilesCommand {
    /// List built-in profiles with their descriptions
    List,
    /// Print a profile as TOML
    Show {
        /// Built-in profile name
        #[arg(default_value = ConfigurationProfile::DEFAULT_NAME)]
        name: String,
        /// Overrides file merged onto the profile before printing
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

/// Run the profiles command.
///
/// # Errors
///
/// Returns an error if the profile is unknown or invalid.
pub fn run(args: &ProfilesArgs) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    match &args.command {
        ProfilesCommand::List => {
            for profile in profiles::builtin_profiles() {
                let marker = if profile.name == ConfigurationProfile::DEFAULT_NAME {
                    " (default)"
                } else {
                    ""
                };
                writeln!(stdout, "{}{marker}\t{}", profile.name, profile.description)?;
            }
        }
        ProfilesCommand::Show { name, file } => {
            let profile = profiles::resolve(Some(name), file.as_deref())?;
            write!(stdout, "{}", profiles::to_toml(&profile)?)?;
        }
    }
    stdout.flush()?;
    Ok(())
}
