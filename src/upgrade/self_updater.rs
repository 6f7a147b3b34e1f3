use anyhow::{Context, Result};
use colored::Colorize;
use std::fmt;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::constants::BINARY_NAME;
use crate::upgrade::assets::{find_checksum_asset, select_asset};
use crate::upgrade::config::UpgradeConfig;
use crate::upgrade::download::{Downloader, HttpsDownloader};
use crate::upgrade::extract::extract_and_install;
use crate::upgrade::installer::{InstallOutcome, Installer, complete_pending_install, default_installer};
use crate::upgrade::release::{GithubReleaseResolver, ReleaseResolver};
use crate::upgrade::verification::ChecksumVerifier;
use crate::upgrade::version_check::versions_differ;
use crate::utils::platform;

/// Locates the executable that an update replaces.
pub trait ExecutablePathProvider: Send + Sync {
    /// Absolute path of the installed executable.
    fn executable_path(&self) -> Result<PathBuf>;
}

/// [`ExecutablePathProvider`] for the running process.
///
/// Symlinks are resolved so the real file is replaced rather than the link.
#[derive(Debug, Default, Clone, Copy)]
pub struct CurrentExecutable;

impl ExecutablePathProvider for CurrentExecutable {
    fn executable_path(&self) -> Result<PathBuf> {
        let exe = std::env::current_exe().context("Failed to locate the running executable")?;
        std::fs::canonicalize(&exe).with_context(|| format!("Failed to resolve {}", exe.display()))
    }
}

/// Finish an update staged by a previous run of the executable `executable`
/// points at.
///
/// Resolves the path the same way [`SelfUpdater::run`] does, so both look for
/// the same `<exe>.new` marker. Returns `true` if a marker was applied.
pub fn apply_staged_update(executable: &dyn ExecutablePathProvider) -> Result<bool> {
    let exe = executable.executable_path()?;
    complete_pending_install(&exe)
}

/// Asks the user whether to proceed.
pub trait Confirmation: Send + Sync {
    /// Returns `true` to proceed.
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Interactive `[y/N]` prompt on stderr.
///
/// Declines without asking when stdin is not a terminal, so unattended runs
/// never block and never update without `--yes`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirmation;

impl Confirmation for StdinConfirmation {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            warn!("stdin is not a terminal; pass --yes to update non-interactively");
            return Ok(false);
        }

        eprint!("{prompt} [y/N] ");
        io::stderr().flush()?;

        let mut answer = String::new();
        stdin.lock().read_line(&mut answer).context("Failed to read confirmation")?;
        Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    }
}

/// Phases of a single update run, in order. `Failed` may follow any phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    CheckingVersion,
    UpToDate,
    UpdateAvailable,
    AwaitingConfirmation,
    Downloading,
    VerifyingChecksum,
    Installing,
    Done,
    Failed,
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CheckingVersion => "checking version",
            Self::UpToDate => "up to date",
            Self::UpdateAvailable => "update available",
            Self::AwaitingConfirmation => "awaiting confirmation",
            Self::Downloading => "downloading",
            Self::VerifyingChecksum => "verifying checksum",
            Self::Installing => "installing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The running version already matches the latest release.
    UpToDate {
        version: String,
    },
    /// The user declined the prompt; nothing was downloaded.
    Declined,
    /// The executable was replaced.
    Installed {
        version: String,
    },
    /// The new binary was staged and takes effect once this process exits.
    Staged {
        version: String,
        staged_path: PathBuf,
    },
}

/// Orchestrates a self-update of the installed executable.
///
/// Every external capability is injected, so tests can substitute any of them.
/// A run goes through the phases of [`UpdateState`]:
///
/// ```text
/// CheckingVersion ─┬─> UpToDate
///                  └─> UpdateAvailable -> AwaitingConfirmation -> Downloading
///                        -> VerifyingChecksum -> Installing -> Done
/// ```
///
/// The installer only ever sees an asset whose SHA-256 matched the published
/// manifest. A release without a manifest is refused. Downloads go to
/// temporary files next to the executable and are deleted on every exit path.
///
/// # Examples
///
/// ```rust,no_run
/// use strata_cli::upgrade::{SelfUpdater, UpdateOutcome, UpgradeConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let updater = SelfUpdater::production(&UpgradeConfig::default(), false, true)?;
/// match updater.run().await? {
///     UpdateOutcome::UpToDate { version } => println!("{version} is current"),
///     outcome => println!("{outcome:?}"),
/// }
/// # Ok(())
/// # }
/// ```
pub struct SelfUpdater {
    resolver: Arc<dyn ReleaseResolver>,
    downloader: Arc<dyn Downloader>,
    executable: Arc<dyn ExecutablePathProvider>,
    installer: Arc<dyn Installer>,
    confirmation: Arc<dyn Confirmation>,
    current_version: String,
    assume_yes: bool,
    binary_name: String,
    os: String,
    arch: String,
}

impl SelfUpdater {
    /// Create an updater from its capabilities.
    ///
    /// Defaults to the compiled-in version, the host platform, the `strata`
    /// binary name and prompting before install.
    pub fn new(
        resolver: Arc<dyn ReleaseResolver>,
        downloader: Arc<dyn Downloader>,
        executable: Arc<dyn ExecutablePathProvider>,
        installer: Arc<dyn Installer>,
        confirmation: Arc<dyn Confirmation>,
    ) -> Self {
        Self {
            resolver,
            downloader,
            executable,
            installer,
            confirmation,
            current_version: env!("CARGO_PKG_VERSION").to_string(),
            assume_yes: false,
            binary_name: BINARY_NAME.to_string(),
            os: platform::target_os().to_string(),
            arch: platform::target_arch().to_string(),
        }
    }

    /// Wire the production capabilities from configuration.
    ///
    /// `assume_yes` is combined with [`UpgradeConfig::assume_yes`]; either
    /// one skips the prompt.
    pub fn production(config: &UpgradeConfig, assume_yes: bool, show_progress: bool) -> Result<Self> {
        Ok(Self::new(
            Arc::new(GithubReleaseResolver::new(config)?),
            Arc::new(HttpsDownloader::new(config)?.with_progress(show_progress)),
            Arc::new(CurrentExecutable),
            default_installer(),
            Arc::new(StdinConfirmation),
        )
        .assume_yes(assume_yes || config.assume_yes))
    }

    #[must_use]
    pub fn current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = version.into();
        self
    }

    #[must_use]
    pub fn assume_yes(mut self, assume_yes: bool) -> Self {
        self.assume_yes = assume_yes;
        self
    }

    /// Name of the executable inside release archives, without `.exe`.
    #[must_use]
    pub fn binary_name(mut self, name: impl Into<String>) -> Self {
        self.binary_name = name.into();
        self
    }

    /// Override the platform tokens used for asset selection.
    #[must_use]
    pub fn platform(mut self, os: impl Into<String>, arch: impl Into<String>) -> Self {
        self.os = os.into();
        self.arch = arch.into();
        self
    }

    /// The version this updater compares against.
    pub fn version(&self) -> &str {
        &self.current_version
    }

    /// Perform one update run.
    ///
    /// # Errors
    ///
    /// Any failure aborts the run and leaves the installed executable as it
    /// was, unless the failure happened inside the installer's final rename.
    pub async fn run(&self) -> Result<UpdateOutcome> {
        let mut state = UpdateState::CheckingVersion;
        match self.run_phases(&mut state).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!("Update failed while {state}: {e:#}");
                transition(&mut state, UpdateState::Failed);
                Err(e)
            }
        }
    }

    async fn run_phases(&self, state: &mut UpdateState) -> Result<UpdateOutcome> {
        debug!("Update state: {state}");
        let exe = self.executable.executable_path()?;
        match complete_pending_install(&exe) {
            Ok(true) => info!("Completed a previously staged update"),
            Ok(false) => {}
            Err(e) => warn!("Could not apply a previously staged update: {e:#}"),
        }

        let release = self.resolver.latest_release().await?;
        if !versions_differ(&self.current_version, &release.tag)? {
            transition(state, UpdateState::UpToDate);
            return Ok(UpdateOutcome::UpToDate {
                version: self.current_version.clone(),
            });
        }

        transition(state, UpdateState::UpdateAvailable);
        let asset = select_asset(&release, &self.os, &self.arch)?;
        let checksum_asset = find_checksum_asset(&release)?;
        print_changelog(&release.tag, &release.changelog_body);

        transition(state, UpdateState::AwaitingConfirmation);
        if !self.assume_yes && !self.confirm(&release.tag).await? {
            return Ok(UpdateOutcome::Declined);
        }

        transition(state, UpdateState::Downloading);
        let dir = download_dir(&exe);
        let asset_file = self.downloader.download(&asset.url, dir).await?;
        let manifest_file = self.downloader.download(&checksum_asset.url, dir).await?;

        transition(state, UpdateState::VerifyingChecksum);
        let verified_name = asset.name.clone();
        let asset_file = tokio::task::spawn_blocking(move || {
            ChecksumVerifier::verify(asset_file.path(), manifest_file.path(), &verified_name)?;
            Ok::<_, anyhow::Error>(asset_file)
        })
        .await
        .context("Checksum task panicked")??;

        transition(state, UpdateState::Installing);
        let installer = Arc::clone(&self.installer);
        let binary = platform::binary_file_name(&self.binary_name);
        let asset_name = asset.name.clone();
        let dest = exe.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let outcome = extract_and_install(
                installer.as_ref(),
                &dest,
                asset_file.path(),
                &asset_name,
                &binary,
            );
            drop(asset_file);
            outcome
        })
        .await
        .context("Install task panicked")??;

        transition(state, UpdateState::Done);
        let version = release.tag;
        Ok(match outcome {
            InstallOutcome::Replaced => UpdateOutcome::Installed { version },
            InstallOutcome::Staged { staged_path } => UpdateOutcome::Staged {
                version,
                staged_path,
            },
        })
    }

    async fn confirm(&self, tag: &str) -> Result<bool> {
        let confirmation = Arc::clone(&self.confirmation);
        let prompt = format!("Proceed with update to {tag}?");
        tokio::task::spawn_blocking(move || confirmation.confirm(&prompt))
            .await
            .context("Confirmation prompt panicked")?
    }
}

fn transition(state: &mut UpdateState, next: UpdateState) {
    debug!("Update state: {state} -> {next}");
    *state = next;
}

fn download_dir(exe: &Path) -> &Path {
    exe.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."))
}

fn print_changelog(tag: &str, body: &str) {
    println!("{} {}", "New release available:".green().bold(), tag.bold());
    if !body.trim().is_empty() {
        println!();
        println!("{body}");
        println!();
    }
}
