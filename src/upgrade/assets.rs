//! Selection of release assets for the host platform.
//!
//! Asset names are matched case-insensitively. A candidate must contain the OS
//! token anywhere in its name and the architecture (or one of its aliases) as
//! a *delimited* token: bounded by the start or end of the name or by `-`,
//! `_` or `.`. That keeps `arm64` from matching inside `noarm64x`.
//!
//! Aliases are tried in preference order, so an exact `amd64` build always wins
//! over an `x86_64` one, which in turn wins over a `universal` bundle.

use anyhow::Result;
use tracing::debug;

use crate::core::StrataError;
use crate::upgrade::release::ReleaseDescriptor;

/// The asset chosen for installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSelection {
    /// Published file name; also used to sniff the archive format.
    pub name: String,
    /// Download URL.
    pub url: String,
}

/// Architecture aliases in preference order.
///
/// The trailing `universal`/`all` entries match multi-architecture bundles.
pub fn arch_aliases(arch: &str) -> Vec<String> {
    let arch = arch.to_lowercase();
    let aliases: &[&str] = match arch.as_str() {
        "amd64" => &["amd64", "x86_64", "x64", "universal", "all"],
        "arm64" => &["arm64", "aarch64", "universal", "all"],
        "386" => &["386", "i386", "i686", "x86", "all"],
        _ => &[],
    };

    if aliases.is_empty() {
        vec![arch, "universal".to_string(), "all".to_string()]
    } else {
        aliases.iter().map(|a| (*a).to_string()).collect()
    }
}

/// Returns `true` if `token` occurs in `name` bounded by separators or the ends.
pub fn contains_token(name: &str, token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    let is_separator = |c: char| matches!(c, '-' | '_' | '.');

    name.match_indices(token).any(|(start, _)| {
        let end = start + token.len();
        let before_ok = name[..start].chars().next_back().is_none_or(is_separator);
        let after_ok = name[end..].chars().next().is_none_or(is_separator);
        before_ok && after_ok
    })
}

/// Returns `true` if the asset looks like a checksum manifest.
pub fn is_checksum_asset(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("sha256") || lower.contains("checksums")
}

/// Pick the asset to install for `os`/`arch`.
///
/// # Errors
///
/// Returns [`StrataError::NoMatchingAsset`] listing every asset name when no
/// alias matches.
pub fn select_asset(release: &ReleaseDescriptor, os: &str, arch: &str) -> Result<AssetSelection> {
    let os = os.to_lowercase();
    let candidates: Vec<_> = release
        .assets
        .iter()
        .filter(|asset| !is_checksum_asset(&asset.name))
        .map(|asset| (asset.name.to_lowercase(), asset))
        .collect();

    for alias in arch_aliases(arch) {
        if let Some((_, asset)) =
            candidates.iter().find(|(lower, _)| lower.contains(&os) && contains_token(lower, &alias))
        {
            debug!("Selected asset {} via architecture alias '{alias}'", asset.name);
            return Ok(AssetSelection {
                name: asset.name.clone(),
                url: asset.download_url.clone(),
            });
        }
    }

    let available = release.assets.iter().map(|a| a.name.as_str()).collect::<Vec<_>>().join(", ");
    Err(StrataError::NoMatchingAsset {
        os,
        arch: arch.to_string(),
        available,
    }
    .into())
}

/// Find the checksum manifest published with the release.
///
/// # Errors
///
/// Returns [`StrataError::ChecksumAssetMissing`]: a release without a
/// manifest is never installed.
pub fn find_checksum_asset(release: &ReleaseDescriptor) -> Result<AssetSelection> {
    release
        .assets
        .iter()
        .find(|asset| is_checksum_asset(&asset.name))
        .map(|asset| AssetSelection {
            name: asset.name.clone(),
            url: asset.download_url.clone(),
        })
        .ok_or_else(|| {
            StrataError::ChecksumAssetMissing {
                tag: release.tag.clone(),
            }
            .into()
        })
}
