//! Local source scanning.
//!
//! Recursively walks an application directory and produces a
//! [`ResourceSet`] with relative paths normalized to forward slashes,
//! a SHA-256 fingerprint and the permission bits of every file.

use std::path::Path;

use cloudpush_protocol::Resource;
use tracing::debug;

use crate::TransferError;
use crate::catalog::ResourceSet;
use crate::fingerprint::calculate_file_checksum;

/// Directory names never included in an application bundle.
pub const IGNORED_DIRS: &[&str] = &[".git", ".hg", ".svn", ".cloudpush"];

/// Scans `root` recursively and returns its files as resources, sorted by
/// path so repeated scans of an unchanged tree are identical.
pub fn scan_resources(root: &Path) -> Result<ResourceSet, TransferError> {
    let mut resources = Vec::new();
    walk_dir(root, root, &mut resources)?;
    resources.sort_by(|a, b| a.path.cmp(&b.path));

    debug!(
        root = %root.display(),
        files = resources.len(),
        "source scan complete"
    );

    Ok(resources.into())
}

fn walk_dir(root: &Path, current: &Path, out: &mut Vec<Resource>) -> Result<(), TransferError> {
    let entries = std::fs::read_dir(current)?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let metadata = entry.metadata()?;

        if metadata.is_dir() {
            let name = entry.file_name();
            if IGNORED_DIRS.iter().any(|d| name == *d) {
                continue;
            }
            walk_dir(root, &path, out)?;
        } else if metadata.is_file() {
            let rel_path = path.strip_prefix(root).map_err(std::io::Error::other)?;

            // Normalize to forward slashes.
            let rel_str = rel_path.to_string_lossy().replace('\\', "/");

            out.push(Resource {
                path: rel_str,
                fingerprint: calculate_file_checksum(&path)?,
                size: metadata.len(),
                mode: file_mode(&metadata),
            });
        }
    }

    Ok(())
}

#[cfg(unix)]
fn file_mode(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(_metadata: &std::fs::Metadata) -> u32 {
    cloudpush_protocol::resource::DEFAULT_MODE
}
