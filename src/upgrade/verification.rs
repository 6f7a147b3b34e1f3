use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use tracing::{debug, info};

use crate::constants::MAX_CHECKSUM_MANIFEST_BYTES;
use crate::core::StrataError;

/// Verifies downloaded release assets against a published SHA-256 manifest.
///
/// # Manifest Format
///
/// One entry per line; blank lines and `#` comments are ignored:
///
/// ```text
/// # multi-file manifest (sha256sum output)
/// 9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08  strata-linux-amd64.tar.gz
/// 60303ae22b998861bce3b28f33eec1be758a213c86c93c076dbe9f558c11c752 *strata-windows-amd64.zip
///
/// # single-file manifest
/// 9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08
/// ```
///
/// A line with one field is a bare digest that applies to whatever file the
/// manifest accompanies. A line with two or more fields is `digest filename`
/// and only applies when the file's base name equals the asset's. The first
/// applicable line wins.
///
/// # Security
///
/// - Manifests above 16 KiB are rejected outright
/// - Digests must decode to exactly 32 bytes
/// - The asset is hashed in full and compared byte for byte
///
/// Verification must complete before extraction or installation starts.
pub struct ChecksumVerifier;

impl ChecksumVerifier {
    /// Compute the SHA-256 digest of a file, streaming its contents.
    pub fn compute_sha256(file_path: &Path) -> Result<[u8; 32]> {
        debug!("Computing SHA256 checksum for: {}", file_path.display());

        let file = File::open(file_path)
            .with_context(|| format!("Failed to open file: {}", file_path.display()))?;
        let mut reader = BufReader::new(file);
        let mut hasher = Sha256::new();
        io::copy(&mut reader, &mut hasher)
            .with_context(|| format!("Failed to read file: {}", file_path.display()))?;

        Ok(hasher.finalize().into())
    }

    /// Look up the expected digest for `asset_name` in a manifest file.
    ///
    /// # Errors
    ///
    /// - [`StrataError::ChecksumManifestTooLarge`] above the size cap
    /// - [`StrataError::ChecksumNotFound`] when no line applies
    /// - [`StrataError::InvalidChecksumManifest`] when the digest is not 32 hex-encoded bytes
    pub fn expected_digest(manifest_path: &Path, asset_name: &str) -> Result<[u8; 32]> {
        let size = std::fs::metadata(manifest_path)
            .with_context(|| {
                format!("Failed to read checksum manifest: {}", manifest_path.display())
            })?
            .len();
        if size > MAX_CHECKSUM_MANIFEST_BYTES {
            return Err(StrataError::ChecksumManifestTooLarge {
                size,
                limit: MAX_CHECKSUM_MANIFEST_BYTES,
            }
            .into());
        }

        let content = std::fs::read(manifest_path).with_context(|| {
            format!("Failed to read checksum manifest: {}", manifest_path.display())
        })?;
        let content = String::from_utf8_lossy(&content);

        let hex_digest = find_entry(&content, asset_name).ok_or_else(|| {
            StrataError::ChecksumNotFound {
                file: asset_name.to_string(),
            }
        })?;

        decode_digest(hex_digest)
    }

    /// Verify `asset_path` against the manifest entry for `asset_name`.
    ///
    /// # Errors
    ///
    /// Any manifest error from [`expected_digest`](Self::expected_digest), or
    /// [`StrataError::ChecksumMismatch`] when the digests differ.
    pub fn verify(asset_path: &Path, manifest_path: &Path, asset_name: &str) -> Result<()> {
        info!("Verifying checksum for: {asset_name}");

        let expected = Self::expected_digest(manifest_path, asset_name)?;
        let actual = Self::compute_sha256(asset_path)?;

        if expected != actual {
            return Err(StrataError::ChecksumMismatch {
                file: asset_name.to_string(),
                expected: hex::encode(expected),
                actual: hex::encode(actual),
            }
            .into());
        }

        info!("Checksum verification successful");
        Ok(())
    }
}

/// First manifest entry that applies to `asset_name`.
fn find_entry<'a>(content: &'a str, asset_name: &str) -> Option<&'a str> {
    let wanted = base_name(asset_name);

    content.lines().map(str::trim).filter(|line| !line.is_empty() && !line.starts_with('#')).find_map(
        |line| {
            let mut fields = line.split_whitespace();
            let digest = fields.next()?;
            match fields.next() {
                None => Some(digest),
                Some(file) => {
                    // sha256sum marks binary-mode entries with a leading '*'
                    let file = file.strip_prefix('*').unwrap_or(file);
                    (base_name(file) == wanted).then_some(digest)
                }
            }
        },
    )
}

fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

fn decode_digest(hex_digest: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(hex_digest).map_err(|e| StrataError::InvalidChecksumManifest {
        reason: format!("'{hex_digest}' is not hex: {e}"),
    })?;

    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
        StrataError::InvalidChecksumManifest {
            reason: format!("digest is {} bytes, expected 32 (SHA-256)", bytes.len()),
        }
        .into()
    })
}
