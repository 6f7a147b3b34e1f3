//! Locating the executable inside a downloaded asset.
//!
//! The asset's published name decides the format. The executable's bytes are
//! streamed straight from the archive reader into the [`Installer`]; nothing
//! is unpacked to disk first.

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

use crate::core::StrataError;
use crate::upgrade::installer::{InstallOutcome, Installer};

/// Container format of a release asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
    /// The asset is the executable itself.
    Raw,
}

impl ArchiveKind {
    /// Detect the format from an asset name, ignoring case.
    pub fn detect(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.ends_with(".zip") {
            Self::Zip
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Self::TarGz
        } else {
            Self::Raw
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
            Self::Raw => "raw",
        }
    }
}

/// Extract `binary_name` from the archive at `archive_path` and hand it to
/// `installer` for `dest`.
///
/// Archive entries are matched on their base name, so `strata` is found at
/// the archive root or under any directory prefix.
///
/// # Errors
///
/// - [`StrataError::BinaryNotInArchive`] if no entry matches
/// - [`StrataError::ArchiveError`] if the archive is corrupt
/// - any error from the installer
pub fn extract_and_install(
    installer: &dyn Installer,
    dest: &Path,
    archive_path: &Path,
    archive_name: &str,
    binary_name: &str,
) -> Result<InstallOutcome> {
    let kind = ArchiveKind::detect(archive_name);
    debug!("Extracting {binary_name} from {archive_name} ({})", kind.label());

    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open {}", archive_path.display()))?;

    match kind {
        ArchiveKind::Zip => install_from_zip(installer, dest, file, binary_name),
        ArchiveKind::TarGz => install_from_tar_gz(installer, dest, file, binary_name),
        ArchiveKind::Raw => installer.install(dest, &mut BufReader::new(file), 0),
    }
}

fn install_from_zip(
    installer: &dyn Installer,
    dest: &Path,
    file: File,
    binary_name: &str,
) -> Result<InstallOutcome> {
    let archive_error = |e: zip::result::ZipError| StrataError::ArchiveError {
        kind: ArchiveKind::Zip.label().to_string(),
        reason: e.to_string(),
    };

    let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(archive_error)?;

    let index = (0..archive.len())
        .find(|&i| {
            archive
                .name_for_index(i)
                .is_some_and(|name| !name.ends_with('/') && base_name(name) == binary_name)
        })
        .ok_or_else(|| not_in_archive(binary_name, ArchiveKind::Zip))?;

    let mut entry = archive.by_index(index).map_err(archive_error)?;
    let mode = entry.unix_mode().unwrap_or(0);
    debug!("Found {} in zip (mode {mode:o})", entry.name());

    installer.install(dest, &mut entry, mode)
}

fn install_from_tar_gz(
    installer: &dyn Installer,
    dest: &Path,
    file: File,
    binary_name: &str,
) -> Result<InstallOutcome> {
    let archive_error = |e: std::io::Error| StrataError::ArchiveError {
        kind: ArchiveKind::TarGz.label().to_string(),
        reason: e.to_string(),
    };

    let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));

    for entry in archive.entries().map_err(archive_error)? {
        let mut entry = entry.map_err(archive_error)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let matches = {
            let path = entry.path().map_err(archive_error)?;
            path.file_name().is_some_and(|name| name == binary_name)
        };
        if !matches {
            continue;
        }

        let mode = entry.header().mode().unwrap_or(0);
        debug!("Found {binary_name} in tar.gz (mode {mode:o})");
        return installer.install(dest, &mut entry, mode);
    }

    Err(not_in_archive(binary_name, ArchiveKind::TarGz).into())
}

fn base_name(entry_name: &str) -> &str {
    entry_name.rsplit(['/', '\\']).next().unwrap_or(entry_name)
}

fn not_in_archive(binary_name: &str, kind: ArchiveKind) -> StrataError {
    StrataError::BinaryNotInArchive {
        binary: binary_name.to_string(),
        kind: kind.label().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upgrade::installer::AtomicRenameInstaller;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    const PAYLOAD: &[u8] = b"#!/bin/sh\necho new strata\n";

    fn write_zip(dir: &TempDir, entries: &[(&str, &[u8])]) -> PathBuf {
        let path = dir.path().join("strata-linux-amd64.zip");
        let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
        let options = SimpleFileOptions::default().unix_permissions(0o750);
        for (name, data) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
        path
    }

    fn write_tar_gz(dir: &TempDir, entries: &[(&str, &[u8])]) -> PathBuf {
        write_tar_gz_with_mode(dir, entries, 0o750)
    }

    fn write_tar_gz_with_mode(dir: &TempDir, entries: &[(&str, &[u8])], mode: u32) -> PathBuf {
        let path = dir.path().join("strata-linux-amd64.tar.gz");
        let encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(mode);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
        path
    }

    fn existing_dest(dir: &TempDir) -> PathBuf {
        let dest = dir.path().join("installed-strata");
        std::fs::write(&dest, b"old").unwrap();
        dest
    }

    #[test]
    fn test_detect() {
        assert_eq!(ArchiveKind::detect("strata-windows-amd64.ZIP"), ArchiveKind::Zip);
        assert_eq!(ArchiveKind::detect("strata-linux-amd64.tar.gz"), ArchiveKind::TarGz);
        assert_eq!(ArchiveKind::detect("strata-linux-amd64.TGZ"), ArchiveKind::TarGz);
        assert_eq!(ArchiveKind::detect("strata-linux-amd64"), ArchiveKind::Raw);
        assert_eq!(ArchiveKind::detect("strata-linux-amd64.gz"), ArchiveKind::Raw);
    }

    #[test]
    fn test_zip_extraction_is_byte_identical() {
        let temp = TempDir::new().unwrap();
        let archive = write_zip(&temp, &[("README.md", &b"docs"[..]), ("strata-1.0/strata", PAYLOAD)]);
        let dest = existing_dest(&temp);

        let outcome = extract_and_install(
            &AtomicRenameInstaller,
            &dest,
            &archive,
            "strata-linux-amd64.zip",
            "strata",
        )
        .unwrap();

        assert_eq!(outcome, InstallOutcome::Replaced);
        assert_eq!(std::fs::read(&dest).unwrap(), PAYLOAD);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            assert_eq!(std::fs::metadata(&dest).unwrap().permissions().mode() & 0o777, 0o750);
        }
    }

    #[test]
    fn test_tar_gz_extraction_is_byte_identical() {
        let temp = TempDir::new().unwrap();
        let archive = write_tar_gz(&temp, &[("LICENSE", &b"MIT"[..]), ("strata", PAYLOAD)]);
        let dest = existing_dest(&temp);

        extract_and_install(
            &AtomicRenameInstaller,
            &dest,
            &archive,
            "strata-linux-amd64.tar.gz",
            "strata",
        )
        .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), PAYLOAD);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            assert_eq!(std::fs::metadata(&dest).unwrap().permissions().mode() & 0o777, 0o750);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_tar_gz_entry_without_exec_bits_is_made_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let archive = write_tar_gz_with_mode(&temp, &[("strata", PAYLOAD)], 0o644);
        let dest = existing_dest(&temp);

        extract_and_install(
            &AtomicRenameInstaller,
            &dest,
            &archive,
            "strata-linux-amd64.tar.gz",
            "strata",
        )
        .unwrap();

        let mode = std::fs::metadata(&dest).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0, "installed binary is not executable: {mode:o}");
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_raw_asset_is_installed_whole() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("strata-linux-amd64");
        std::fs::write(&archive, PAYLOAD).unwrap();
        let dest = existing_dest(&temp);

        extract_and_install(&AtomicRenameInstaller, &dest, &archive, "strata-linux-amd64", "strata")
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), PAYLOAD);
    }

    #[test]
    fn test_missing_binary() {
        let temp = TempDir::new().unwrap();
        let dest = existing_dest(&temp);

        let zip = write_zip(&temp, &[("strata-helper", PAYLOAD)]);
        let err =
            extract_and_install(&AtomicRenameInstaller, &dest, &zip, "a.zip", "strata").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StrataError>(),
            Some(StrataError::BinaryNotInArchive { .. })
        ));

        let tgz = write_tar_gz(&temp, &[("bin/strata.exe", PAYLOAD)]);
        let err =
            extract_and_install(&AtomicRenameInstaller, &dest, &tgz, "a.tar.gz", "strata").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StrataError>(),
            Some(StrataError::BinaryNotInArchive { .. })
        ));

        assert_eq!(std::fs::read(&dest).unwrap(), b"old");
    }

    #[test]
    fn test_corrupt_zip() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("broken.zip");
        std::fs::write(&archive, b"not a zip").unwrap();
        let dest = existing_dest(&temp);

        let err = extract_and_install(&AtomicRenameInstaller, &dest, &archive, "broken.zip", "strata")
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<StrataError>(), Some(StrataError::ArchiveError { .. })));
    }
}
