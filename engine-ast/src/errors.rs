use engine_cache::CacheError;
use engine_core::errors::{ErrorCode, ErrorCoded};
use engine_fs::FsError;

#[derive(Debug, thiserror::Error)]
pub enum AstError {
    #[error("no plugin registered that supports {0}")]
    Unsupported(String),

    #[error("underlying file error: {0}")]
    Fs(#[from] FsError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

impl ErrorCoded for AstError {
    fn code(&self) -> ErrorCode {
        match self {
            // Unsupported content is reported structurally inside
            // ParseResult.errors, not thrown; this variant only fires
            // when the facade itself has no fallback plugin at all,
            // which given the plain-text fallback should never happen
            // in practice.
            AstError::Unsupported(_) => ErrorCode::ParseError,
            AstError::Fs(e) => e.code(),
            AstError::Cache(e) => e.code(),
        }
    }
}

pub type AstResult<T> = Result<T, AstError>;
