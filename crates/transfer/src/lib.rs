//! Application bits transfer: resource catalog, local source scanning,
//! zip archiving and streamed multipart upload bodies.
//!
//! # Pipeline
//!
//! 1. **Scan**: walk the source directory into a [`ResourceSet`]
//! 2. **Diff**: split it against what the control plane already holds
//! 3. **Archive**: zip only the resources that must be transmitted
//! 4. **Encode**: stream the multipart body through a bounded pipe

pub mod archive;
pub mod catalog;
pub mod fingerprint;
pub mod multipart;
pub mod scanner;
pub mod validation;

pub use archive::{Archive, zip_resources};
pub use catalog::{ResourceDiff, ResourceSet, diff};
pub use fingerprint::{calculate_file_checksum, checksum_bytes};
pub use multipart::{MultipartFraming, UploadBody, build_upload_body, estimate_size};
pub use scanner::scan_resources;
pub use validation::validate_resource_path;

/// Capacity of the in-memory pipe between the multipart producer and the
/// HTTP transport. Peak memory of an upload is bounded by this value.
pub const PIPE_CAPACITY: usize = 64 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("multipart encoding failed: {0}")]
    Encoding(String),
}
