use std::path::{Component, Path};

use crate::TransferError;

/// Validates that a resource path stays inside the application root.
///
/// Rejects empty paths, absolute paths, `..` traversal and Windows
/// prefix components. Resource paths arrive from the control plane as
/// well as from the local scan, so both are checked before any file is
/// opened relative to the root.
pub fn validate_resource_path(resource_path: &str) -> Result<(), TransferError> {
    if resource_path.is_empty() {
        return Err(TransferError::InvalidPath("empty path".into()));
    }

    let path = Path::new(resource_path);

    if path.is_absolute() {
        return Err(TransferError::InvalidPath(format!(
            "absolute path not allowed: {resource_path}"
        )));
    }

    for component in path.components() {
        match component {
            Component::ParentDir => {
                return Err(TransferError::InvalidPath(format!(
                    "parent directory traversal not allowed: {resource_path}"
                )));
            }
            Component::Prefix(_) | Component::RootDir => {
                return Err(TransferError::InvalidPath(format!(
                    "absolute path not allowed: {resource_path}"
                )));
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_path() {
        assert!(validate_resource_path("").is_err());
    }

    #[test]
    fn rejects_parent_dir_traversal() {
        assert!(validate_resource_path("../../etc/passwd").is_err());
        assert!(validate_resource_path("lib/../../escape").is_err());
        assert!(validate_resource_path("..").is_err());
    }

    #[test]
    fn rejects_absolute_unix_path() {
        assert!(validate_resource_path("/tmp/malicious").is_err());
    }

    #[test]
    fn accepts_bundle_paths() {
        assert!(validate_resource_path("Procfile").is_ok());
        assert!(validate_resource_path("public/css/site.css").is_ok());
        assert!(validate_resource_path(".profile.d/setup.sh").is_ok());
        assert!(validate_resource_path("./manifest.yml").is_ok());
    }
}
