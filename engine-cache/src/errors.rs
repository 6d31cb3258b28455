use engine_core::errors::{ErrorCode, ErrorCoded};
use engine_fs::FsError;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("underlying file error: {0}")]
    Fs(#[from] FsError),
}

impl ErrorCoded for CacheError {
    fn code(&self) -> ErrorCode {
        match self {
            CacheError::Fs(e) => e.code(),
        }
    }
}

pub type CacheResult<T> = Result<T, CacheError>;
