//! Global configuration management for Strata.
//!
//! This module handles the global user configuration file which stores
//! user-wide settings. The self-update subsystem reads its `[upgrade]` table.
//!
//! # Configuration File Location
//!
//! - **Unix/macOS**: `~/.strata/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\strata\config.toml`
//!
//! The location can be overridden with `--config` or the `STRATA_CONFIG_PATH`
//! environment variable. A missing file is not an error: defaults are used.
//!
//! # File Format
//!
//! ```toml
//! [upgrade]
//! assume_yes = true
//! download_timeout_secs = 600
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::constants::CONFIG_PATH_ENV;
use crate::core::StrataError;
use crate::upgrade::config::UpgradeConfig;

/// Global configuration for Strata.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct GlobalConfig {
    /// Upgrade configuration settings.
    ///
    /// Controls where releases come from, network deadlines, and whether the
    /// confirmation prompt is skipped.
    #[serde(default, skip_serializing_if = "UpgradeConfig::is_default")]
    pub upgrade: UpgradeConfig,
}

impl GlobalConfig {
    /// Load global configuration from an optional explicit path.
    ///
    /// If a path is provided, loads from that path; otherwise from
    /// [`default_path`](Self::default_path). A missing file yields defaults.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            debug!("No global config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load global configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML for
    /// this schema.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        toml::from_str(&content).map_err(|e| {
            anyhow::Error::from(StrataError::ConfigError {
                message: format!("{}: {}", path.display(), e.message()),
            })
        })
    }

    /// Get the path of the global configuration file.
    ///
    /// `STRATA_CONFIG_PATH` wins when set; otherwise the platform location.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory (or local data directory on
    /// Windows) cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("strata")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".strata")
        };

        Ok(config_dir.join("config.toml"))
    }
}
