//! Atomic replacement of the installed executable.
//!
//! Both installers write the new binary into a temporary file next to the
//! destination (same directory, so same filesystem) and then rename it into
//! place. A reader of the destination path sees either the old file or the
//! new one, never a partial write.
//!
//! Windows refuses to rename over a running executable. [`StagedMoveInstaller`]
//! therefore leaves the new binary beside it as `<exe>.new` and hands the final
//! move to a detached helper that waits for this process to exit. If the
//! helper never runs, [`complete_pending_install`] finishes the job on the next
//! start.

use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::constants::{DEFAULT_EXECUTABLE_MODE, STAGED_HELPER_WAIT_SECS, STAGED_SUFFIX};
use crate::core::StrataError;
use crate::utils::platform;

/// How an install completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The destination now holds the new binary.
    Replaced,
    /// The new binary waits at `staged_path` for a helper to move it into place.
    Staged {
        /// Location of the `<exe>.new` marker.
        staged_path: PathBuf,
    },
}

/// Writes a binary stream over an existing executable.
///
/// Implementations run inside `spawn_blocking` and may block freely.
pub trait Installer: Send + Sync {
    /// Replace `dest` with the bytes read from `source`.
    ///
    /// `mode` carries Unix permission bits; `0` means
    /// [`DEFAULT_EXECUTABLE_MODE`]. Archives often store the binary without
    /// execute bits, so on Unix every class that may read the file may also
    /// execute it.
    fn install(&self, dest: &Path, source: &mut dyn Read, mode: u32) -> Result<InstallOutcome>;
}

/// Installer for POSIX hosts: write, sync, rename.
///
/// A failed rename is fatal and leaves `dest` untouched; the temporary file is
/// removed when its handle drops.
#[derive(Debug, Default, Clone, Copy)]
pub struct AtomicRenameInstaller;

impl Installer for AtomicRenameInstaller {
    fn install(&self, dest: &Path, source: &mut dyn Read, mode: u32) -> Result<InstallOutcome> {
        let temp = write_sibling_temp(dest, source, mode)?;

        temp.persist(dest).map_err(|e| StrataError::InstallFailed {
            path: dest.display().to_string(),
            reason: e.error.to_string(),
        })?;

        info!("Replaced {}", dest.display());
        Ok(InstallOutcome::Replaced)
    }
}

/// Installer for Windows hosts.
///
/// Tries the same rename as [`AtomicRenameInstaller`]. When that fails
/// (typically because `dest` is the running image) the new binary is persisted
/// as `<dest>.new` and a detached helper is spawned to move it over `dest`
/// once this process exits. The helper is never awaited.
#[derive(Debug, Default, Clone, Copy)]
pub struct StagedMoveInstaller;

impl Installer for StagedMoveInstaller {
    fn install(&self, dest: &Path, source: &mut dyn Read, mode: u32) -> Result<InstallOutcome> {
        let temp = write_sibling_temp(dest, source, mode)?;

        let temp = match temp.persist(dest) {
            Ok(_) => {
                info!("Replaced {}", dest.display());
                return Ok(InstallOutcome::Replaced);
            }
            Err(e) => {
                debug!("Direct replacement of {} failed: {}", dest.display(), e.error);
                e.file
            }
        };

        let staged = staged_path(dest);
        temp.persist(&staged).map_err(|e| StrataError::InstallFailed {
            path: staged.display().to_string(),
            reason: e.error.to_string(),
        })?;

        if let Err(e) = spawn_move_helper(&staged, dest) {
            // The marker is still picked up by the next start.
            warn!("Could not launch update helper: {e:#}");
        }

        info!("Staged update at {}", staged.display());
        Ok(InstallOutcome::Staged {
            staged_path: staged,
        })
    }
}

/// The installer for the host platform.
pub fn default_installer() -> Arc<dyn Installer> {
    if platform::is_windows() {
        Arc::new(StagedMoveInstaller)
    } else {
        Arc::new(AtomicRenameInstaller)
    }
}

/// Path of the staged-update marker for `exe`: `<exe>.new`.
pub fn staged_path(exe: &Path) -> PathBuf {
    let mut name = exe.as_os_str().to_os_string();
    name.push(".");
    name.push(STAGED_SUFFIX);
    PathBuf::from(name)
}

/// Finish an update staged by a previous run.
///
/// Must run before anything else touches the executable. Returns `true` if a
/// marker was consumed. Only Windows stages updates; elsewhere this is a no-op.
///
/// # Errors
///
/// Returns [`StrataError::InstallFailed`] if a marker exists but cannot be
/// moved over `exe`.
pub fn complete_pending_install(exe: &Path) -> Result<bool> {
    if platform::is_windows() {
        consume_staged_marker(exe)
    } else {
        Ok(false)
    }
}

fn consume_staged_marker(exe: &Path) -> Result<bool> {
    let staged = staged_path(exe);
    if !staged.is_file() {
        return Ok(false);
    }

    fs::rename(&staged, exe).map_err(|e| StrataError::InstallFailed {
        path: exe.display().to_string(),
        reason: format!("could not apply staged update {}: {e}", staged.display()),
    })?;

    info!("Applied staged update from {}", staged.display());
    Ok(true)
}

fn write_sibling_temp(dest: &Path, source: &mut dyn Read, mode: u32) -> Result<NamedTempFile> {
    let dir = dest.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));

    let mut temp = tempfile::Builder::new()
        .prefix(".strata-install-")
        .tempfile_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;

    let written = io::copy(source, &mut temp)
        .with_context(|| format!("Failed to write new binary for {}", dest.display()))?;
    temp.flush()?;
    debug!("Wrote {written} bytes to {}", temp.path().display());

    apply_mode(temp.path(), if mode == 0 { DEFAULT_EXECUTABLE_MODE } else { mode })?;

    temp.as_file().sync_all().with_context(|| format!("Failed to sync {}", temp.path().display()))?;
    Ok(temp)
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = executable_mode(mode);
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| {
        StrataError::InstallFailed {
            path: path.display().to_string(),
            reason: format!("failed to set mode {mode:o}: {e}"),
        }
        .into()
    })
}

/// Grant execute to every class with read access, and always to the owner.
#[cfg(unix)]
fn executable_mode(mode: u32) -> u32 {
    let mode = mode & 0o7777;
    mode | ((mode & 0o444) >> 2) | 0o100
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Launch a detached process that moves `staged` over `dest` after we exit.
fn spawn_move_helper(staged: &Path, dest: &Path) -> Result<()> {
    let pid = std::process::id();
    let mut command = if let Some(shell) =
        ["pwsh", "powershell"].into_iter().find(|shell| platform::command_exists(shell))
    {
        let script = format!(
            "$p = Get-Process -Id {pid} -ErrorAction SilentlyContinue; \
             if ($p) {{ $p.WaitForExit({wait_ms}) | Out-Null }}; \
             Move-Item -Force -LiteralPath '{staged}' -Destination '{dest}'",
            wait_ms = STAGED_HELPER_WAIT_SECS * 1000,
            staged = powershell_quote(staged),
            dest = powershell_quote(dest),
        );
        let mut command = Command::new(shell);
        command.args(["-NoProfile", "-NonInteractive", "-Command", &script]);
        command
    } else {
        let mut command = Command::new("cmd");
        command.arg("/C").arg(format!(
            "timeout /T {STAGED_HELPER_WAIT_SECS} /NOBREAK >NUL & move /Y \"{}\" \"{}\" >NUL",
            staged.display(),
            dest.display()
        ));
        command
    };

    command.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        command.creation_flags(CREATE_NEW_PROCESS_GROUP | CREATE_NO_WINDOW);
    }

    let child = command
        .spawn()
        .with_context(|| format!("Failed to spawn {:?}", command.get_program()))?;
    debug!("Spawned update helper (pid {})", child.id());
    Ok(())
}

fn powershell_quote(path: &Path) -> String {
    path.display().to_string().replace('\'', "''")
}
