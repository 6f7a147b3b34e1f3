use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use strata_cli::test_utils::fixtures::{sha256_hex, tar_gz_with, zip_with};
use strata_cli::test_utils::{
    FixedConfirmation, FixedExecutable, InMemoryDownloader, init_test_logging,
};
use strata_cli::upgrade::installer::{default_installer, staged_path};
use strata_cli::upgrade::release::GithubReleaseResolver;
use strata_cli::upgrade::{SelfUpdater, UpdateOutcome, UpgradeConfig};
use strata_cli::utils::platform::{binary_file_name, target_arch, target_os};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LATEST: &str = "/repos/strata-labs/strata-cli/releases/latest";
const DOWNLOADS: &str = "https://dl.example.com/v99.0.0";

fn host_asset(extension: &str) -> String {
    format!("strata-{}-{}.{extension}", target_os(), target_arch())
}

/// Serve a release with the given asset names from a mock API.
async fn serve_release(server: &MockServer, tag: &str, assets: &[&str], expected_calls: u64) {
    let assets: Vec<_> = assets
        .iter()
        .map(|name| json!({"name": name, "browser_download_url": format!("{DOWNLOADS}/{name}")}))
        .collect();

    Mock::given(method("GET"))
        .and(path(LATEST))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tag_name": tag,
            "body": "Bug fixes.",
            "assets": assets,
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

struct Install {
    _temp: TempDir,
    exe: PathBuf,
}

impl Install {
    fn new() -> Result<Self> {
        let temp = TempDir::new()?;
        let exe = temp.path().join(binary_file_name("strata"));
        std::fs::write(&exe, b"old")?;
        Ok(Self { _temp: temp, exe })
    }

    fn updater(&self, server: &MockServer, downloader: Arc<InMemoryDownloader>) -> Result<SelfUpdater> {
        let config = UpgradeConfig {
            api_base_url: server.uri(),
            ..UpgradeConfig::default()
        };
        Ok(SelfUpdater::new(
            Arc::new(GithubReleaseResolver::new(&config)?.with_token(None)),
            downloader,
            Arc::new(FixedExecutable::new(self.exe.clone())),
            default_installer(),
            Arc::new(FixedConfirmation::new(false)),
        )
        .current_version("1.0.0")
        .assume_yes(true))
    }

    fn leftover_files(&self) -> usize {
        std::fs::read_dir(self.exe.parent().unwrap()).unwrap().count()
    }
}

/// A full run against a newer release replaces the executable's contents.
#[tokio::test]
async fn test_upgrade_replaces_executable() -> Result<()> {
    init_test_logging(None);
    let server = MockServer::start().await;
    let asset = host_asset("tar.gz");
    serve_release(&server, "v99.0.0", &[asset.as_str(), "checksums.txt"], 1).await;

    let archive = tar_gz_with(&binary_file_name("strata"), b"new");
    // Single-file manifest: a bare digest.
    let manifest = format!("{}\n", sha256_hex(&archive));
    let downloader = Arc::new(
        InMemoryDownloader::new()
            .with_file(format!("{DOWNLOADS}/{asset}"), archive)
            .with_file(format!("{DOWNLOADS}/checksums.txt"), manifest.into_bytes()),
    );

    let install = Install::new()?;
    let outcome = install.updater(&server, downloader.clone())?.run().await?;

    match outcome {
        UpdateOutcome::Installed { version } => {
            assert_eq!(version, "v99.0.0");
            assert_eq!(std::fs::read(&install.exe)?, b"new");
        }
        UpdateOutcome::Staged { staged_path: staged, .. } => {
            assert_eq!(staged, staged_path(&install.exe));
            assert_eq!(std::fs::read(&staged)?, b"new");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(
        downloader.requested_urls(),
        vec![format!("{DOWNLOADS}/{asset}"), format!("{DOWNLOADS}/checksums.txt")]
    );
    assert_eq!(install.leftover_files(), 1);
    Ok(())
}

#[tokio::test]
async fn test_upgrade_from_zip_asset() -> Result<()> {
    let server = MockServer::start().await;
    let asset = host_asset("zip");
    serve_release(&server, "v99.0.0", &[asset.as_str(), "strata_checksums.txt"], 1).await;

    let archive = zip_with(&format!("strata-99/{}", binary_file_name("strata")), b"new from zip");
    let manifest = format!("{}  {asset}\n", sha256_hex(&archive));
    let downloader = Arc::new(
        InMemoryDownloader::new()
            .with_file(format!("{DOWNLOADS}/{asset}"), archive)
            .with_file(format!("{DOWNLOADS}/strata_checksums.txt"), manifest.into_bytes()),
    );

    let install = Install::new()?;
    let outcome = install.updater(&server, downloader)?.run().await?;

    assert_eq!(
        outcome,
        UpdateOutcome::Installed {
            version: "v99.0.0".to_string()
        }
    );
    assert_eq!(std::fs::read(&install.exe)?, b"new from zip");
    Ok(())
}

/// Running twice against the current version never downloads anything.
#[tokio::test]
async fn test_up_to_date_is_idempotent() -> Result<()> {
    let server = MockServer::start().await;
    let asset = host_asset("tar.gz");
    serve_release(&server, "v1.0.0", &[asset.as_str(), "checksums.txt"], 2).await;

    let downloader = Arc::new(InMemoryDownloader::new());
    let install = Install::new()?;

    for _ in 0..2 {
        let outcome = install.updater(&server, downloader.clone())?.run().await?;
        assert_eq!(
            outcome,
            UpdateOutcome::UpToDate {
                version: "1.0.0".to_string()
            }
        );
    }

    assert_eq!(downloader.request_count(), 0);
    assert_eq!(std::fs::read(&install.exe)?, b"old");
    Ok(())
}

#[tokio::test]
async fn test_tampered_asset_is_not_installed() -> Result<()> {
    let server = MockServer::start().await;
    let asset = host_asset("tar.gz");
    serve_release(&server, "v99.0.0", &[asset.as_str(), "checksums.txt"], 1).await;

    let archive = tar_gz_with(&binary_file_name("strata"), b"new");
    let manifest = format!("{}  {asset}\n", sha256_hex(b"something else"));
    let downloader = Arc::new(
        InMemoryDownloader::new()
            .with_file(format!("{DOWNLOADS}/{asset}"), archive)
            .with_file(format!("{DOWNLOADS}/checksums.txt"), manifest.into_bytes()),
    );

    let install = Install::new()?;
    let err = install.updater(&server, downloader)?.run().await.unwrap_err();

    assert!(err.to_string().contains("Checksum mismatch"), "{err:#}");
    assert_eq!(std::fs::read(&install.exe)?, b"old");
    assert_eq!(install.leftover_files(), 1);
    Ok(())
}

#[tokio::test]
async fn test_api_failure_leaves_executable_alone() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let downloader = Arc::new(InMemoryDownloader::new());
    let install = Install::new()?;
    assert!(install.updater(&server, downloader.clone())?.run().await.is_err());

    assert_eq!(downloader.request_count(), 0);
    assert_eq!(std::fs::read(&install.exe)?, b"old");
    Ok(())
}

#[test]
fn test_upgrade_help_lists_yes_flag() {
    Command::cargo_bin("strata")
        .unwrap()
        .args(["upgrade", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--yes"));
}

#[test]
fn test_unknown_flag_fails() {
    Command::cargo_bin("strata")
        .unwrap()
        .args(["upgrade", "--force"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}
