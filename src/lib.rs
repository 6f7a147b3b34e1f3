//! Strata command-line tool.
//!
//! The library half of the `strata` binary. Most of it is the self-update
//! machinery behind `strata upgrade`: release discovery, asset selection,
//! checksum verification, archive extraction and atomic replacement of the
//! running executable.
//!
//! # Core Modules
//!
//! - [`cli`] - Command-line parsing and command dispatch
//! - [`config`] - Global configuration (`~/.strata/config.toml`)
//! - [`constants`] - Timeouts, size caps and environment variable names
//! - [`core`] - Error types and user-facing error formatting
//! - [`upgrade`] - Self-update of the installed executable
//! - [`utils`] - Platform detection and progress reporting
//!
//! # Example
//!
//! ```rust,no_run
//! use strata_cli::upgrade::{SelfUpdater, UpgradeConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let outcome = SelfUpdater::production(&UpgradeConfig::default(), true, false)?
//!     .run()
//!     .await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod upgrade;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
