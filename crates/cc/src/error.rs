use std::time::Duration;

use cloudpush_protocol::UnknownJobStatus;
use cloudpush_transfer::TransferError;

/// Errors produced by Cloud Controller calls.
#[derive(Debug, thiserror::Error)]
pub enum CcError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error {status} [{error_code} {code}]: {description}")]
    Api {
        status: u16,
        code: i64,
        error_code: String,
        description: String,
    },

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error(transparent)]
    UnknownJobStatus(#[from] UnknownJobStatus),

    #[error("job {job_guid} failed: {message}")]
    JobFailed { job_guid: String, message: String },

    #[error("job {job_guid} did not finish within {timeout:?}")]
    JobTimeout { job_guid: String, timeout: Duration },

    #[error("upload body encoding failed: {0}")]
    Encoding(String),

    #[error("cancelled")]
    Cancelled,
}

impl CcError {
    /// True for failures of the request itself rather than of the job it
    /// started.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Io(_) | Self::Api { .. })
    }
}

impl From<TransferError> for CcError {
    fn from(e: TransferError) -> Self {
        match e {
            TransferError::InvalidArgument(msg) => Self::InvalidArgument(msg),
            TransferError::Io(e) => Self::Io(e),
            TransferError::Json(e) => Self::Json(e),
            TransferError::Encoding(msg) => Self::Encoding(msg),
            other => Self::Encoding(other.to_string()),
        }
    }
}
