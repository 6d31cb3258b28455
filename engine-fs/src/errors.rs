//! File Service error taxonomy (spec §7 subset).

use engine_core::errors::{ErrorCode, ErrorCoded};

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("path escapes workspace root: {0}")]
    OutOfWorkspace(String),

    #[error("path blocked by security policy: {0}")]
    Blocked(String),

    #[error("already exists: {0}")]
    Conflict(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("glob pattern error: {0}")]
    Glob(#[from] ignore::Error),
}

impl ErrorCoded for FsError {
    fn code(&self) -> ErrorCode {
        match self {
            FsError::NotFound(_) => ErrorCode::NotFound,
            FsError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            FsError::OutOfWorkspace(_) => ErrorCode::OutOfWorkspace,
            FsError::Blocked(_) => ErrorCode::PermissionDenied,
            FsError::Conflict(_) => ErrorCode::Conflict,
            FsError::Io(_) => ErrorCode::Io,
            FsError::Glob(_) => ErrorCode::Validation,
        }
    }
}

pub type FsResult<T> = Result<T, FsError>;
