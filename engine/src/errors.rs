//! `EngineError` — composes every sub-crate's error type behind one
//! `?`-friendly enum (spec §7 expansion), the same composition pattern
//! as the teacher's `ContextError::Storage(#[from] StorageError)`.

use engine_core::errors::{ErrorCode, ErrorCoded};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Fs(#[from] engine_fs::FsError),

    #[error(transparent)]
    Cache(#[from] engine_cache::CacheError),

    #[error(transparent)]
    Ast(#[from] engine_ast::AstError),

    #[error(transparent)]
    Plan(#[from] engine_plan::PlanError),

    #[error(transparent)]
    Tx(#[from] engine_tx::TxError),

    #[error(transparent)]
    Exec(#[from] engine_exec::ExecError),

    #[error(transparent)]
    Storage(#[from] engine_storage::StorageError),
}

impl ErrorCoded for EngineError {
    fn code(&self) -> ErrorCode {
        match self {
            EngineError::Fs(e) => e.code(),
            EngineError::Cache(e) => e.code(),
            EngineError::Ast(e) => e.code(),
            EngineError::Plan(e) => e.code(),
            EngineError::Tx(e) => e.code(),
            EngineError::Exec(e) => e.code(),
            EngineError::Storage(e) => e.code(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
