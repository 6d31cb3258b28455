//! Predictive Pre-loader error taxonomy (spec §7). Narrow on purpose:
//! prediction and warming are best-effort background activity (spec
//! §5 "never surface errors"), so this enum only covers the paths a
//! caller can actually observe — dependency-graph construction and
//! ast-backed feature extraction, both of which go through the same
//! fallible components the rest of the engine uses.

use engine_ast::AstError;
use engine_cache::CacheError;
use engine_core::errors::{ErrorCode, ErrorCoded};
use engine_fs::FsError;

#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error(transparent)]
    Fs(#[from] FsError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Ast(#[from] AstError),

    #[error("ill-formed predictor configuration: {0}")]
    Validation(String),
}

impl ErrorCoded for PredictError {
    fn code(&self) -> ErrorCode {
        match self {
            PredictError::Fs(e) => e.code(),
            PredictError::Cache(e) => e.code(),
            PredictError::Ast(e) => e.code(),
            PredictError::Validation(_) => ErrorCode::Validation,
        }
    }
}

pub type PredictResult<T> = Result<T, PredictError>;
