//! # engine-exec
//!
//! The Execution Engine (spec §4.F): stage-wise dispatch of the five
//! operation kinds, progress reporting, cancellation, and error
//! aggregation into a [`engine_core::model::Response`].
//!
//! Analyzer/Editor/Creator/Deleter/Validator are plain structs
//! implementing the common [`handler::OperationHandler`] trait,
//! dispatched by matching on the `Operation` enum — tagged dispatch,
//! not a class hierarchy (spec §9 design note).

pub mod analyzer;
pub mod context;
pub mod creator;
pub mod deleter;
pub mod editor;
pub mod engine;
pub mod errors;
pub mod fingerprint;
pub mod handler;
pub mod validator;

pub use analyzer::Analyzer;
pub use context::ExecContext;
pub use creator::Creator;
pub use deleter::Deleter;
pub use editor::Editor;
pub use engine::Engine;
pub use errors::ExecError;
pub use handler::OperationHandler;
pub use validator::Validator;
