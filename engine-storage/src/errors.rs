//! Storage error taxonomy (spec §7). Narrow: persistence is entirely
//! optional (spec §6 "Persisted state"), so the only failures a caller
//! can hit are the database itself being unreachable or a stored
//! document failing to deserialize back into the shape it asked for.

use engine_core::errors::{ErrorCode, ErrorCoded};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("stored document is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl ErrorCoded for StorageError {
    fn code(&self) -> ErrorCode {
        match self {
            StorageError::Sqlite(_) => ErrorCode::Io,
            StorageError::Corrupt(_) => ErrorCode::Internal,
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
