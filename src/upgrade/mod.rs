//! Self-update of the installed `strata` executable.
//!
//! `strata upgrade` replaces the running binary with the latest published
//! release. The work is split into small pieces, each behind its own module:
//!
//! - [`release`] - fetch the latest release descriptor from the releases API
//! - [`version_check`] - decide whether that release differs from the running version
//! - [`assets`] - pick the asset for this OS/architecture and the checksum manifest
//! - [`download`] - stream assets to temporary files next to the executable
//! - [`verification`] - SHA-256 check against the manifest
//! - [`extract`] - pull the executable out of a zip, tar.gz or raw asset
//! - [`installer`] - atomically swap the executable (staged on Windows)
//! - [`self_updater`] - [`SelfUpdater`], which sequences all of the above
//!
//! # Update Process Flow
//!
//! ```text
//! 1. Version Check
//!    ├── Complete any staged update from a previous run
//!    ├── Fetch the latest release
//!    └── Stop if its tag matches the running version
//!
//! 2. Confirmation
//!    ├── Print the release notes
//!    └── Ask, unless --yes or `upgrade.assume_yes` is set
//!
//! 3. Download & Verify
//!    ├── Download the platform asset and the checksum manifest
//!    └── Abort on any checksum problem; nothing is installed
//!
//! 4. Install
//!    ├── Extract the executable and write it to a sibling temp file
//!    └── Rename over the executable, or stage `<exe>.new` on Windows
//! ```
//!
//! # Security Considerations
//!
//! - Assets are only downloaded over HTTPS
//! - Releases without a checksum manifest are refused
//! - The installer never sees bytes that failed verification
//! - The executable is replaced by rename, never rewritten in place
//!
//! # Configuration
//!
//! See [`config::UpgradeConfig`] for the `[upgrade]` table of the global
//! configuration file.

pub mod assets;
pub mod config;
pub mod download;
pub mod extract;
pub mod installer;
pub mod release;
pub mod self_updater;
pub mod verification;
pub mod version_check;

pub use config::UpgradeConfig;
pub use installer::{InstallOutcome, Installer, complete_pending_install};
pub use self_updater::{
    CurrentExecutable, SelfUpdater, UpdateOutcome, UpdateState, apply_staged_update,
};
pub use verification::ChecksumVerifier;
