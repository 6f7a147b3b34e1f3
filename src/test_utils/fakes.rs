//! In-memory stand-ins for the self-updater's capabilities.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::NamedTempFile;

use crate::core::StrataError;
use crate::upgrade::download::Downloader;
use crate::upgrade::installer::{AtomicRenameInstaller, InstallOutcome, Installer};
use crate::upgrade::release::{ReleaseDescriptor, ReleaseResolver};
use crate::upgrade::self_updater::{Confirmation, ExecutablePathProvider};

/// Always returns the same release.
pub struct StaticReleaseResolver {
    release: ReleaseDescriptor,
}

impl StaticReleaseResolver {
    pub fn new(release: ReleaseDescriptor) -> Self {
        Self { release }
    }
}

#[async_trait]
impl ReleaseResolver for StaticReleaseResolver {
    async fn latest_release(&self) -> Result<ReleaseDescriptor> {
        Ok(self.release.clone())
    }
}

/// Serves registered URLs from memory and records every request.
///
/// Unknown URLs fail with a 404 [`StrataError::HttpStatus`]. Unlike the
/// production downloader any scheme is accepted.
#[derive(Default)]
pub struct InMemoryDownloader {
    files: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl InMemoryDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file(mut self, url: impl Into<String>, content: Vec<u8>) -> Self {
        self.files.insert(url.into(), content);
        self
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Downloader for InMemoryDownloader {
    async fn download(&self, url: &str, dir: &Path) -> Result<NamedTempFile> {
        self.requests.lock().unwrap().push(url.to_string());

        let content = self.files.get(url).ok_or_else(|| StrataError::HttpStatus {
            operation: format!("download of {url}"),
            status: "404 Not Found".to_string(),
        })?;

        let mut file = tempfile::Builder::new().prefix(".strata-download-").tempfile_in(dir)?;
        file.write_all(content)?;
        file.flush()?;
        Ok(file)
    }
}

/// Points the updater at a fixed path.
pub struct FixedExecutable(PathBuf);

impl FixedExecutable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }
}

impl ExecutablePathProvider for FixedExecutable {
    fn executable_path(&self) -> Result<PathBuf> {
        Ok(self.0.clone())
    }
}

/// Gives the same answer to every prompt and counts how often it was asked.
pub struct FixedConfirmation {
    answer: bool,
    asked: AtomicUsize,
}

impl FixedConfirmation {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: AtomicUsize::new(0),
        }
    }

    pub fn times_asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

impl Confirmation for FixedConfirmation {
    fn confirm(&self, _prompt: &str) -> Result<bool> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer)
    }
}

/// Records every install, then performs it with [`AtomicRenameInstaller`].
#[derive(Default)]
pub struct RecordingInstaller {
    installs: Mutex<Vec<(PathBuf, Vec<u8>)>>,
}

impl RecordingInstaller {
    /// `(destination, bytes)` for each install, in call order.
    pub fn installed(&self) -> Vec<(PathBuf, Vec<u8>)> {
        self.installs.lock().unwrap().clone()
    }
}

impl Installer for RecordingInstaller {
    fn install(&self, dest: &Path, source: &mut dyn Read, mode: u32) -> Result<InstallOutcome> {
        let mut content = Vec::new();
        source.read_to_end(&mut content)?;
        self.installs.lock().unwrap().push((dest.to_path_buf(), content.clone()));
        AtomicRenameInstaller.install(dest, &mut content.as_slice(), mode)
    }
}
