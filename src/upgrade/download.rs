//! Streaming asset downloads.
//!
//! Downloads land in a [`NamedTempFile`] created in a caller-chosen directory;
//! the file is deleted when the handle is dropped, so every exit path of the
//! caller cleans up.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::constants::USER_AGENT;
use crate::core::StrataError;
use crate::upgrade::config::UpgradeConfig;
use crate::utils::progress::{ProgressBar, ProgressWriter};

/// Fetches a URL into a temporary file.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` into a new temporary file inside `dir`.
    ///
    /// The returned file is removed when dropped.
    async fn download(&self, url: &str, dir: &Path) -> Result<NamedTempFile>;
}

/// Reject anything but `https://` before touching the network.
///
/// # Errors
///
/// Returns [`StrataError::InsecureUrl`] for other schemes and for strings
/// that do not parse as URLs.
pub fn ensure_https(url: &str) -> Result<Url> {
    match Url::parse(url) {
        Ok(parsed) if parsed.scheme() == "https" => Ok(parsed),
        _ => Err(StrataError::InsecureUrl {
            url: url.to_string(),
        }
        .into()),
    }
}

/// Production [`Downloader`] over HTTPS with a progress bar.
///
/// The client refuses plain HTTP, so a redirect to an `http://` location
/// fails instead of downgrading the transfer.
pub struct HttpsDownloader {
    client: reqwest::Client,
    timeout: Duration,
    show_progress: bool,
}

impl HttpsDownloader {
    /// Create a downloader using the configured download deadline.
    pub fn new(config: &UpgradeConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(true)?,
            timeout: config.download_timeout(),
            show_progress: true,
        })
    }

    /// Enable or disable the progress bar. `STRATA_NO_PROGRESS` disables it
    /// regardless.
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Transfer `url` into `dir` under the download deadline.
    ///
    /// Scheme checks belong to the caller.
    async fn fetch(&self, url: Url, dir: &Path) -> Result<NamedTempFile> {
        let label = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .unwrap_or("download")
            .to_string();

        tokio::time::timeout(self.timeout, self.transfer(url, &label, dir))
            .await
            .map_err(|_| StrataError::Timeout {
                operation: format!("download of {label}"),
                seconds: self.timeout.as_secs(),
            })?
    }

    async fn transfer(&self, url: Url, label: &str, dir: &Path) -> Result<NamedTempFile> {
        let transport_error = |e: reqwest::Error| StrataError::NetworkError {
            operation: format!("download of {label}"),
            reason: e.to_string(),
        };

        let mut response = self.client.get(url).send().await.map_err(transport_error)?;
        if response.status() != StatusCode::OK {
            return Err(StrataError::HttpStatus {
                operation: format!("download of {label}"),
                status: response.status().to_string(),
            }
            .into());
        }

        let file = tempfile::Builder::new()
            .prefix(".strata-download-")
            .tempfile_in(dir)
            .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;

        let bar = if self.show_progress {
            ProgressBar::download(response.content_length(), label)
        } else {
            ProgressBar::hidden()
        };

        // On error the writer drops the temp file, which deletes it.
        let mut writer = ProgressWriter::new(file, bar.clone());
        while let Some(chunk) = response.chunk().await.map_err(transport_error)? {
            writer.write_all(&chunk).with_context(|| format!("Failed to write {label} to disk"))?;
        }
        writer.flush().with_context(|| format!("Failed to flush {label} to disk"))?;
        let file = writer.into_inner();
        bar.finish_and_clear();

        info!("Downloaded {label} ({} bytes)", bar.position());
        Ok(file)
    }
}

fn build_client(https_only: bool) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .https_only(https_only)
        .build()
        .map_err(|e| {
            StrataError::NetworkError {
                operation: "HTTP client setup".to_string(),
                reason: e.to_string(),
            }
            .into()
        })
}

#[async_trait]
impl Downloader for HttpsDownloader {
    async fn download(&self, url: &str, dir: &Path) -> Result<NamedTempFile> {
        let parsed = ensure_https(url)?;
        debug!("Downloading {url}");
        self.fetch(parsed, dir).await
    }
}
