//! Transaction Manager error taxonomy (spec §7 `Transaction` code).

use engine_core::errors::{ErrorCode, ErrorCoded};
use engine_fs::FsError;

#[derive(Debug, thiserror::Error)]
pub enum TxError {
    #[error("no active transaction: {0}")]
    NotFound(String),

    #[error("failed to snapshot pre-state: {0}")]
    SnapshotFailed(#[source] FsError),

    #[error("rollback failed: {0}")]
    RollbackFailed(#[source] FsError),
}

impl ErrorCoded for TxError {
    fn code(&self) -> ErrorCode {
        ErrorCode::Transaction
    }
}

pub type TxResult<T> = Result<T, TxError>;
