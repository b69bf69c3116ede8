//! Zip archiving of the resources that must be transmitted.

use std::path::Path;

use cloudpush_protocol::Resource;
use tempfile::NamedTempFile;
use tracing::debug;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::TransferError;
use crate::validation::validate_resource_path;

/// A zip archive written to a temporary file.
///
/// The file is removed when the `Archive` is dropped.
#[derive(Debug)]
pub struct Archive {
    file: NamedTempFile,
    len: u64,
}

impl Archive {
    /// Exact archive length in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Opens an independent async reader positioned at the start.
    pub async fn open(&self) -> std::io::Result<tokio::fs::File> {
        tokio::fs::File::open(self.file.path()).await
    }
}

/// Zips exactly `resources` (read relative to `root`) into a temp file.
///
/// Entries keep their unix permission bits. An empty list produces a
/// valid, empty zip.
pub fn zip_resources(root: &Path, resources: &[Resource]) -> Result<Archive, TransferError> {
    let tmp = NamedTempFile::new()?;

    let mut zip = ZipWriter::new(tmp.as_file());
    for resource in resources {
        validate_resource_path(&resource.path)?;

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(resource.mode & 0o7777);

        zip.start_file(resource.path.as_str(), options)?;
        let mut f = std::fs::File::open(root.join(&resource.path))?;
        std::io::copy(&mut f, &mut zip)?;
    }
    zip.finish()?;

    let len = tmp.as_file().metadata()?.len();
    debug!(entries = resources.len(), bytes = len, "archive written");

    Ok(Archive { file: tmp, len })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    fn res(path: &str, mode: u32) -> Resource {
        Resource::new(path, "unused", 0, mode)
    }

    #[test]
    fn zips_only_listed_resources() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("keep.txt"), b"server has me").unwrap();
        std::fs::create_dir_all(dir.path().join("lib")).unwrap();
        std::fs::write(dir.path().join("lib/new.rb"), b"puts 1").unwrap();

        let archive = zip_resources(dir.path(), &[res("lib/new.rb", 0o644)]).unwrap();
        assert!(archive.len() > 0);

        let mut zip = zip::ZipArchive::new(std::fs::File::open(archive.path()).unwrap()).unwrap();
        assert_eq!(zip.len(), 1);

        let mut entry = zip.by_name("lib/new.rb").unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        assert_eq!(content, "puts 1");
    }

    #[cfg(unix)]
    #[test]
    fn keeps_unix_mode() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("run.sh"), b"#!/bin/sh").unwrap();

        let archive = zip_resources(dir.path(), &[res("run.sh", 0o755)]).unwrap();
        let mut zip = zip::ZipArchive::new(std::fs::File::open(archive.path()).unwrap()).unwrap();
        let entry = zip.by_index(0).unwrap();
        assert_eq!(entry.unix_mode().map(|m| m & 0o777), Some(0o755));
    }

    #[test]
    fn empty_list_is_valid_zip() {
        let dir = TempDir::new().unwrap();
        let archive = zip_resources(dir.path(), &[]).unwrap();
        let zip = zip::ZipArchive::new(std::fs::File::open(archive.path()).unwrap()).unwrap();
        assert_eq!(zip.len(), 0);
    }

    #[test]
    fn rejects_escaping_path() {
        let dir = TempDir::new().unwrap();
        let res = zip_resources(dir.path(), &[res("../outside", 0o644)]);
        assert!(matches!(res, Err(TransferError::InvalidPath(_))));
    }

    #[test]
    fn missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let res = zip_resources(dir.path(), &[res("ghost.txt", 0o644)]);
        assert!(matches!(res, Err(TransferError::Io(_))));
    }

    #[tokio::test]
    async fn open_reads_whole_archive() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a"), b"aaaa").unwrap();
        let archive = zip_resources(dir.path(), &[res("a", 0o644)]).unwrap();

        let mut buf = Vec::new();
        archive.open().await.unwrap().read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf.len() as u64, archive.len());
    }
}
