//! Global constants used throughout the Strata codebase.
//!
//! This module contains timeout durations, size caps, environment variable
//! names and other values shared by several modules. Defining them centrally
//! keeps magic numbers discoverable.

use std::time::Duration;

/// GitHub repository owner that publishes Strata releases.
pub const DEFAULT_REPO_OWNER: &str = "strata-labs";

/// GitHub repository name that publishes Strata releases.
pub const DEFAULT_REPO_NAME: &str = "strata-cli";

/// Base URL of the releases API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Name of the executable inside release archives (without `.exe`).
pub const BINARY_NAME: &str = "strata";

/// Timeout for the release lookup (15 seconds).
///
/// Kept well below [`DOWNLOAD_TIMEOUT`] so a stalled API never holds the
/// command for minutes.
pub const API_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for a single asset download (5 minutes).
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Largest `Retry-After` value (exclusive, in seconds) honoured on a 403.
pub const MAX_RETRY_AFTER_SECS: u64 = 60;

/// Number of rate-limit retries before the 403 becomes fatal.
pub const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Checksum manifests above this size are rejected as invalid (16 KiB).
pub const MAX_CHECKSUM_MANIFEST_BYTES: u64 = 16 * 1024;

/// Permission bits applied when an archive does not carry a mode.
pub const DEFAULT_EXECUTABLE_MODE: u32 = 0o755;

/// Suffix of the staging marker written next to a locked executable.
pub const STAGED_SUFFIX: &str = "new";

/// How long the detached Windows helper waits for this process to exit.
pub const STAGED_HELPER_WAIT_SECS: u64 = 15;

/// Progress bar redraw rate in Hz.
pub const PROGRESS_REFRESH_HZ: u8 = 4;

/// Environment variable holding an optional API token.
pub const TOKEN_ENV: &str = "STRATA_GITHUB_TOKEN";

/// Fallback token variable shared with other GitHub tooling.
pub const FALLBACK_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Environment variable overriding the global configuration path.
pub const CONFIG_PATH_ENV: &str = "STRATA_CONFIG_PATH";

/// Environment variable disabling progress indicators when set.
pub const NO_PROGRESS_ENV: &str = "STRATA_NO_PROGRESS";

/// `User-Agent` sent to the releases API and download hosts.
pub const USER_AGENT: &str = concat!("strata-cli/", env!("CARGO_PKG_VERSION"));
