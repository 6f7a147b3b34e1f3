//! Error handling for Strata
//!
//! This module provides the error types and user-friendly error reporting used by
//! the self-update subsystem. The design follows two principles:
//! 1. **Strongly-typed errors** so callers and tests can match on the failure mode
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Error Categories
//!
//! - **Transient**: [`StrataError::RateLimited`] (only after the retry budget is spent)
//! - **Network/IO**: [`StrataError::HttpStatus`], [`StrataError::NetworkError`],
//!   [`StrataError::InsecureUrl`], [`StrataError::Timeout`], ...
//! - **Integrity**: [`StrataError::ChecksumAssetMissing`], [`StrataError::ChecksumMismatch`], ...
//!   These always abort before the installed executable is touched.
//! - **Archive**: [`StrataError::BinaryNotInArchive`], [`StrataError::ArchiveError`]
//! - **Install**: [`StrataError::InstallFailed`]
//!
//! Use [`user_friendly_error`] to turn any [`anyhow::Error`] into an [`ErrorContext`]
//! for display.
//!
//! # Examples
//!
//! ```rust,no_run
//! use strata_cli::core::{StrataError, user_friendly_error};
//!
//! let err = anyhow::Error::from(StrataError::ChecksumNotFound {
//!     file: "strata-linux-amd64.tar.gz".to_string(),
//! });
//! user_friendly_error(err).display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for Strata operations.
///
/// Variants carry owned strings rather than source errors so the enum stays
/// [`Clone`] and can be rebuilt into an [`ErrorContext`] after downcasting.
#[derive(Error, Debug, Clone)]
pub enum StrataError {
    /// The releases API kept answering 403 with a usable `Retry-After`.
    #[error("Release API rate limit exceeded after {attempts} attempts")]
    RateLimited {
        /// Number of requests issued, including the first
        attempts: u32,
    },

    /// A server answered with an unexpected HTTP status.
    #[error("{operation} failed: HTTP {status}")]
    HttpStatus {
        /// What was being requested (e.g. "release lookup")
        operation: String,
        /// Status code and canonical reason, e.g. `404 Not Found`
        status: String,
    },

    /// Transport-level failure (DNS, TLS, connection reset, ...).
    #[error("Network error during {operation}: {reason}")]
    NetworkError {
        /// What was being requested
        operation: String,
        /// The underlying error message
        reason: String,
    },

    /// A network step exceeded its deadline.
    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        /// What was being requested
        operation: String,
        /// The deadline that expired
        seconds: u64,
    },

    /// The release descriptor could not be decoded.
    #[error("Invalid release response: {reason}")]
    InvalidReleaseResponse {
        /// Decoder error message
        reason: String,
    },

    /// A download URL did not use HTTPS.
    #[error("Refusing to download over a non-HTTPS URL: {url}")]
    InsecureUrl {
        /// The rejected URL
        url: String,
    },

    /// A version string normalized to nothing.
    #[error("Invalid version string: '{version}'")]
    InvalidVersion {
        /// The raw version as received
        version: String,
    },

    /// No release asset matched the host platform.
    #[error("No release asset found for {os}/{arch}; available assets: {available}")]
    NoMatchingAsset {
        /// Target operating system
        os: String,
        /// Target architecture
        arch: String,
        /// Comma-separated list of every asset name in the release
        available: String,
    },

    /// The release does not publish a checksum manifest.
    #[error("Release {tag} has no checksum manifest asset; refusing to install unverified binary")]
    ChecksumAssetMissing {
        /// Release tag
        tag: String,
    },

    /// The checksum manifest exceeds the size cap.
    #[error("Checksum manifest is too large ({size} bytes, limit {limit})")]
    ChecksumManifestTooLarge {
        /// Observed size in bytes
        size: u64,
        /// Maximum accepted size in bytes
        limit: u64,
    },

    /// The manifest has no entry for the downloaded asset.
    #[error("Checksum for file not found: {file}")]
    ChecksumNotFound {
        /// Asset base name that was looked up
        file: String,
    },

    /// The manifest entry is not a SHA-256 hex digest.
    #[error("Invalid checksum manifest: {reason}")]
    InvalidChecksumManifest {
        /// What was wrong with the entry
        reason: String,
    },

    /// The downloaded asset does not hash to the published digest.
    #[error("Checksum mismatch for {file}")]
    ChecksumMismatch {
        /// Asset base name
        file: String,
        /// Digest from the manifest
        expected: String,
        /// Digest computed locally
        actual: String,
    },

    /// The archive does not contain the expected executable.
    #[error("Binary '{binary}' not found in {kind} archive")]
    BinaryNotInArchive {
        /// Expected executable name
        binary: String,
        /// Archive kind ("zip", "tar.gz")
        kind: String,
    },

    /// The archive could not be read.
    #[error("Failed to read {kind} archive: {reason}")]
    ArchiveError {
        /// Archive kind
        kind: String,
        /// Reader error message
        reason: String,
    },

    /// Replacing the executable failed.
    #[error("Failed to install update to {path}: {reason}")]
    InstallFailed {
        /// Destination executable path
        path: String,
        /// Underlying error message
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// Generic error for cases not covered by specific variants
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

/// Error wrapper that adds user-facing details and a suggestion.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying Strata error
    pub error: StrataError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: StrataError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with terminal colors.
    ///
    /// - Error message: red and bold
    /// - Details: yellow
    /// - Suggestion: green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`].
///
/// [`StrataError`] values anywhere in the chain get tailored suggestions;
/// I/O errors get filesystem guidance; everything else is shown with its
/// full context chain as details.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(strata_error) = error.chain().find_map(|e| e.downcast_ref::<StrataError>()) {
        let mut ctx = create_error_context(strata_error.clone());
        if ctx.details.is_none() && error.chain().count() > 1 {
            ctx = ctx.with_details(format!("{error:#}"));
        }
        return ctx;
    }

    if let Some(io_error) = error.chain().find_map(|e| e.downcast_ref::<std::io::Error>()) {
        let message = format!("{error:#}");
        return match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                ErrorContext::new(StrataError::Other { message })
                    .with_suggestion(
                        "Re-run with write access to the directory containing the strata executable (sudo/Administrator), or reinstall it to a user-writable location",
                    )
            }
            _ => ErrorContext::new(StrataError::Other { message }),
        };
    }

    ErrorContext::new(StrataError::Other {
        message: format!("{error:#}"),
    })
}

/// Build the tailored [`ErrorContext`] for a specific [`StrataError`].
#[must_use]
pub fn create_error_context(error: StrataError) -> ErrorContext {
    match &error {
        StrataError::RateLimited { .. } => ErrorContext::new(error)
            .with_suggestion("Set STRATA_GITHUB_TOKEN (or GITHUB_TOKEN) to raise the API rate limit, or try again later"),
        StrataError::HttpStatus { .. } | StrataError::NetworkError { .. } => {
            ErrorContext::new(error)
                .with_suggestion("Check your internet connection and proxy settings, then retry")
        }
        StrataError::InvalidReleaseResponse { .. } => ErrorContext::new(error)
            .with_details("The releases API returned an unexpected body")
            .with_suggestion("Check that the configured API base URL and repository point at a GitHub releases endpoint"),
        StrataError::Timeout { .. } => ErrorContext::new(error)
            .with_suggestion("The network is slow or unreachable; retry on a faster connection"),
        StrataError::InsecureUrl { .. } => ErrorContext::new(error)
            .with_details("Release assets are only downloaded over HTTPS"),
        StrataError::NoMatchingAsset { .. } => ErrorContext::new(error).with_suggestion(
            "This platform has no prebuilt release; build from source or download manually",
        ),
        StrataError::ChecksumAssetMissing { .. }
        | StrataError::ChecksumManifestTooLarge { .. }
        | StrataError::ChecksumNotFound { .. }
        | StrataError::InvalidChecksumManifest { .. } => ErrorContext::new(error)
            .with_details("The installed executable was not modified")
            .with_suggestion("Report the broken release; do not install it manually"),
        StrataError::ChecksumMismatch { expected, actual, .. } => {
            let details = format!(
                "Expected: {expected}\nActual:   {actual}\nThe installed executable was not modified"
            );
            ErrorContext::new(error)
                .with_details(details)
                .with_suggestion("Retry the upgrade; if it keeps failing the download may have been tampered with")
        }
        StrataError::BinaryNotInArchive { .. } | StrataError::ArchiveError { .. } => {
            ErrorContext::new(error).with_details("The installed executable was not modified")
        }
        StrataError::InstallFailed { .. } => ErrorContext::new(error).with_suggestion(
            "Check that you can write to the directory containing the strata executable",
        ),
        StrataError::ConfigError { .. } => ErrorContext::new(error)
            .with_suggestion("Check ~/.strata/config.toml (or STRATA_CONFIG_PATH) for TOML syntax errors"),
        StrataError::InvalidVersion { .. } | StrataError::Other { .. } => {
            ErrorContext::new(error)
        }
    }
}
