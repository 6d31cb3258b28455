//! `OperationHandler` — the common interface Analyzer/Editor/Creator/
//! Deleter/Validator all implement, dispatched by matching on the
//! `Operation` enum (spec §9 "tagged dispatch, not class hierarchy").

use engine_core::model::Operation;

use crate::errors::ExecError;

/// One handler per operation kind. Object-safe so the engine can hold
/// `&dyn OperationHandler` without generics leaking into the dispatch
/// loop.
pub trait OperationHandler: Send + Sync {
    fn run(&self, ctx: &crate::context::ExecContext, op: &Operation) -> Result<serde_json::Value, ExecError>;
}
