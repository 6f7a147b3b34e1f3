//! `strata upgrade`: replace the installed executable with the latest release.
//!
//! # Examples
//!
//! ```bash
//! strata upgrade        # show release notes, then ask before installing
//! strata upgrade --yes  # install without asking
//! ```
//!
//! Exits 0 when already up to date, when the update is installed or staged,
//! and when the prompt is declined. Any failure exits non-zero and leaves the
//! installed executable untouched.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing::debug;

use super::CliConfig;
use crate::config::GlobalConfig;
use crate::upgrade::version_check::format_version_info;
use crate::upgrade::{SelfUpdater, UpdateOutcome};

/// Command-line arguments for `strata upgrade`.
#[derive(Parser, Debug)]
pub struct UpgradeArgs {
    /// Install without asking for confirmation
    ///
    /// Also enabled by `assume_yes = true` in the `[upgrade]` section of the
    /// global config.
    #[arg(short, long)]
    pub yes: bool,
}

/// Execute the upgrade command with production wiring.
pub async fn execute(args: UpgradeArgs, cli: &CliConfig) -> Result<()> {
    let config = GlobalConfig::load_with_optional(cli.config_path.clone()).await?;
    debug!("Upgrade settings: {:?}", config.upgrade);

    let updater = SelfUpdater::production(&config.upgrade, args.yes, cli.show_progress())?;
    println!("{}", "Checking for updates...".cyan());

    let outcome = updater.run().await?;
    report(updater.version(), &outcome);
    Ok(())
}

/// Print a one-line summary of the run.
pub fn report(current_version: &str, outcome: &UpdateOutcome) {
    match outcome {
        UpdateOutcome::UpToDate { .. } => {
            println!("{}", format_version_info(current_version, None).green());
        }
        UpdateOutcome::Declined => {
            println!("{}", "Update cancelled; nothing was changed".yellow());
        }
        UpdateOutcome::Installed { version } => {
            println!(
                "{}",
                format!("Successfully upgraded strata {current_version} -> {version}").green().bold()
            );
        }
        UpdateOutcome::Staged {
            version,
            staged_path,
        } => {
            println!(
                "{}",
                format!("strata {version} is staged at {}", staged_path.display()).green()
            );
            println!("It replaces the current executable once this process exits.");
        }
    }
}
