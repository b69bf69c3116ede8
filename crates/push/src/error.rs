//! Push error types.

use cloudpush_cc::CcError;
use cloudpush_transfer::TransferError;

/// Errors that stop a push.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("cloud controller error: {0}")]
    Cc(CcError),

    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("conflicting resources for paths: {}", paths.join(", "))]
    DiffInconsistency { paths: Vec<String> },

    #[error("cancelled")]
    Cancelled,
}

impl From<CcError> for PushError {
    fn from(e: CcError) -> Self {
        match e {
            CcError::Cancelled => Self::Cancelled,
            other => Self::Cc(other),
        }
    }
}
