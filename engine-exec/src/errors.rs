//! Execution Engine error taxonomy (spec §7).

use engine_ast::AstError;
use engine_cache::CacheError;
use engine_core::errors::{ErrorCode, ErrorCoded};
use engine_fs::FsError;
use engine_plan::PlanError;
use engine_tx::TxError;

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("planning failed: {0}")]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Ast(#[from] AstError),

    #[error(transparent)]
    Tx(#[from] TxError),

    #[error("ill-formed operation: {0}")]
    Validation(String),

    #[error("operation timed out")]
    Timeout,

    #[error("operation cancelled")]
    Cancelled,

    #[error("invariant violated: {0}")]
    Internal(String),
}

impl ErrorCoded for ExecError {
    fn code(&self) -> ErrorCode {
        match self {
            ExecError::Plan(e) => e.code(),
            ExecError::Fs(e) => e.code(),
            ExecError::Cache(e) => e.code(),
            ExecError::Ast(e) => e.code(),
            ExecError::Tx(e) => e.code(),
            ExecError::Validation(_) => ErrorCode::Validation,
            ExecError::Timeout => ErrorCode::Timeout,
            ExecError::Cancelled => ErrorCode::Cancelled,
            ExecError::Internal(_) => ErrorCode::Internal,
        }
    }
}

pub type ExecResult<T> = Result<T, ExecError>;
