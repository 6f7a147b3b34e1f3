use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{
    API_TIMEOUT, DEFAULT_API_BASE_URL, DEFAULT_REPO_NAME, DEFAULT_REPO_OWNER, DOWNLOAD_TIMEOUT,
};

/// Configuration settings for Strata self-update behavior.
///
/// `UpgradeConfig` lives in the `[upgrade]` table of the global configuration
/// file and controls where releases are looked up, how long network steps may
/// take, and whether the confirmation prompt is pre-answered.
///
/// # Default Behavior
///
/// - Always ask before installing (`assume_yes = false`)
/// - Official release repository on `api.github.com`
/// - 15 second release lookup, 5 minute asset download
///
/// # TOML Example
/// ```toml
/// [upgrade]
/// assume_yes = false
/// repo_owner = "strata-labs"
/// repo_name = "strata-cli"
/// api_base_url = "https://api.github.com"
/// api_timeout_secs = 15
/// download_timeout_secs = 300
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeConfig {
    /// Answer "yes" to the confirmation prompt without asking.
    ///
    /// The `--yes` flag of `strata upgrade` has the same effect for a single run.
    pub assume_yes: bool,

    /// Owner of the repository publishing releases.
    pub repo_owner: String,

    /// Name of the repository publishing releases.
    pub repo_name: String,

    /// Base URL of the releases API.
    ///
    /// Pointing this at a mirror (or a local mock in tests) is the only
    /// supported way to change where releases come from.
    pub api_base_url: String,

    /// Deadline for the release lookup, in seconds.
    pub api_timeout_secs: u64,

    /// Deadline for each asset download, in seconds.
    ///
    /// Binaries can be large, so this is independent of and much longer than
    /// [`api_timeout_secs`](Self::api_timeout_secs).
    pub download_timeout_secs: u64,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            assume_yes: false,
            repo_owner: DEFAULT_REPO_OWNER.to_string(),
            repo_name: DEFAULT_REPO_NAME.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_timeout_secs: API_TIMEOUT.as_secs(),
            download_timeout_secs: DOWNLOAD_TIMEOUT.as_secs(),
        }
    }
}

impl UpgradeConfig {
    /// Release lookup deadline as a [`Duration`].
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    /// Asset download deadline as a [`Duration`].
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// Returns `true` when every field holds its default value.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}
