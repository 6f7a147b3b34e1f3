//! Command-line interface for Strata.
//!
//! # Available Commands
//!
//! - `upgrade` - Replace the installed `strata` with the latest release
//!   (requires the default `self-update` feature)
//!
//! # Global Options
//!
//! All commands support these global options:
//! - `--verbose` - Enable debug output
//! - `--quiet` - Suppress all output except errors
//! - `--no-progress` - Disable progress bars
//! - `--config` - Path to a custom global config file
//!
//! # Example
//!
//! ```bash
//! # Update, answering the prompt up front
//! strata upgrade --yes
//!
//! # Same, with debug logging and no progress bar (e.g. in CI)
//! strata --verbose --no-progress upgrade -y
//! ```

#[cfg(feature = "self-update")]
pub mod upgrade;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::constants::{CONFIG_PATH_ENV, NO_PROGRESS_ENV};

/// Settings derived from global flags, passed to every command.
///
/// Commands take their environment from here instead of re-reading flags or
/// environment variables, which keeps them testable in-process.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive; `None` leaves `RUST_LOG` (or the `warn` default)
    /// in charge.
    pub log_level: Option<String>,

    /// Hide progress bars.
    pub no_progress: bool,

    /// Global config file to load instead of the default location.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the global tracing subscriber.
    ///
    /// Logs go to stderr so they never mix with command output. Calling this
    /// more than once is harmless.
    pub fn init_logging(&self) {
        let filter = match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Whether progress bars may be drawn.
    pub fn show_progress(&self) -> bool {
        !self.no_progress && std::env::var_os(NO_PROGRESS_ENV).is_none()
    }
}

/// Strata command-line interface.
#[derive(Parser)]
#[command(name = "strata", about = "Strata command-line tool", version, author)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the global config file
    #[arg(short, long, global = true, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Upgrade strata to the latest release
    #[cfg(feature = "self-update")]
    Upgrade(upgrade::UpgradeArgs),
}

impl Cli {
    /// Execute the selected command with configuration built from the flags.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_config(config).await
    }

    /// Build a [`CliConfig`] from the global flags.
    ///
    /// `--verbose` maps to `debug` and `--quiet` to `error`; otherwise the
    /// level comes from `RUST_LOG`, defaulting to `warn`.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            no_progress: self.no_progress,
            config_path: self.config.clone(),
        }
    }

    /// Execute with an explicit configuration.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        debug!("CLI settings: {config:?}");
        match self.command {
            #[cfg(feature = "self-update")]
            Commands::Upgrade(args) => upgrade::execute(args, &config).await,
        }
    }
}
