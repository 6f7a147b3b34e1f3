//! Builders for release descriptors and asset archives.

use flate2::Compression;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

use crate::upgrade::release::{ReleaseAsset, ReleaseDescriptor};

/// A release whose assets download from `https://example.com/<name>`.
pub fn release_with_assets(tag: &str, body: &str, names: &[&str]) -> ReleaseDescriptor {
    ReleaseDescriptor {
        tag: tag.to_string(),
        changelog_body: body.to_string(),
        assets: names
            .iter()
            .map(|name| ReleaseAsset {
                name: (*name).to_string(),
                download_url: format!("https://example.com/{name}"),
            })
            .collect(),
    }
}

/// A gzipped tarball holding a single executable entry.
pub fn tar_gz_with(entry_name: &str, content: &[u8]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o755);
    header.set_cksum();
    builder.append_data(&mut header, entry_name, content).unwrap();
    builder.into_inner().unwrap().finish().unwrap()
}

/// A zip archive holding a single executable entry.
pub fn zip_with(entry_name: &str, content: &[u8]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file(entry_name, SimpleFileOptions::default().unix_permissions(0o755)).unwrap();
    zip.write_all(content).unwrap();
    zip.finish().unwrap().into_inner()
}

/// Lowercase hex SHA-256 of `content`.
pub fn sha256_hex(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}
