//! Test utilities for Strata.
//!
//! Fakes for every capability the self-updater depends on, fixture builders
//! for release archives, and a one-time tracing setup for tests.
//!
//! Enabled for unit tests and, through the `test-utils` feature, for the
//! integration suite.

pub mod fakes;
pub mod fixtures;

pub use fakes::{
    FixedConfirmation, FixedExecutable, InMemoryDownloader, RecordingInstaller,
    StaticReleaseResolver,
};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has any effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=strata_cli=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}
