//! Version comparison for update detection.
//!
//! Release tags and the compiled-in crate version are compared by their
//! normalized key: a leading `v` is stripped and everything from the first
//! `-` (pre-release) or `+` (build metadata) onwards is dropped. Two versions
//! are the same iff their keys are equal.
//!
//! This is an equality check, not semver ordering: an update is
//! offered whenever the published tag differs from the running version, in
//! either direction. Because pre-release suffixes are dropped, `1.2.3-rc1` and
//! `1.2.3` compare equal.

use anyhow::Result;
use tracing::debug;

use crate::core::StrataError;

/// Normalize a raw version string into its comparison key.
///
/// ```rust
/// use strata_cli::upgrade::version_check::normalize_version;
///
/// assert_eq!(normalize_version("v1.2.3"), "1.2.3");
/// assert_eq!(normalize_version("1.2.3-rc1"), "1.2.3");
/// assert_eq!(normalize_version("1.2.3+build.7"), "1.2.3");
/// ```
pub fn normalize_version(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_prefix = trimmed.strip_prefix('v').unwrap_or(trimmed);
    match without_prefix.find(['-', '+']) {
        Some(idx) => &without_prefix[..idx],
        None => without_prefix,
    }
}

/// Returns whether `latest` names a different release than `current`.
///
/// # Errors
///
/// Returns [`StrataError::InvalidVersion`] if either version normalizes to
/// an empty string.
pub fn versions_differ(current: &str, latest: &str) -> Result<bool> {
    let current_key = normalize_version(current);
    if current_key.is_empty() {
        return Err(StrataError::InvalidVersion {
            version: current.to_string(),
        }
        .into());
    }

    let latest_key = normalize_version(latest);
    if latest_key.is_empty() {
        return Err(StrataError::InvalidVersion {
            version: latest.to_string(),
        }
        .into());
    }

    debug!("Comparing version keys: current={current_key} latest={latest_key}");
    Ok(current_key != latest_key)
}

/// Format version information for display.
pub fn format_version_info(current: &str, latest: Option<&str>) -> String {
    match latest {
        Some(latest) if matches!(versions_differ(current, latest), Ok(true)) => {
            format!("Current version: {current}\nLatest version:  {latest} (update available)")
        }
        _ => format!("Current version: {current} (up to date)"),
    }
}
