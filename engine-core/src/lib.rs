//! # engine-core
//!
//! Foundation crate for the file-manipulation engine.
//! Defines the request/response data model, the fixed error-code
//! taxonomy, configuration types, cancellation/progress primitives,
//! and the tracing setup every other crate in the workspace builds on.

#![allow(dead_code)]

pub mod cancellation;
pub mod collections;
pub mod config;
pub mod errors;
pub mod events;
pub mod ids;
pub mod logging;
pub mod model;
pub mod progress;

pub use cancellation::CancellationToken;
pub use collections::{FxHashMap, FxHashSet};
pub use errors::{ErrorCode, ErrorEnvelope, ErrorCoded};
pub use events::{AccessEventSink, AccessKind, AccessPatternEvent, NullEventSink};
pub use ids::{OperationId, TransactionId};
pub use model::{
    Operation, OperationEnvelope, OperationKind, OperationResult, OperationStatus,
    PerformanceSummary, Request, RequestOptions, Response, ResponseSummary,
};
pub use progress::ProgressEvent;
