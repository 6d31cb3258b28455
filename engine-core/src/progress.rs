//! Progress reporting primitives for the Execution Engine (spec §4.F).

use serde::{Deserialize, Serialize};

use crate::ids::OperationId;

/// A single progress notification emitted as operations move through
/// their lifecycle. The engine calls the caller-supplied progress
/// sink with these; it never blocks on the sink's own I/O.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProgressEvent {
    StageStarted { stage_index: usize, operation_count: usize },
    OperationStarted { id: OperationId },
    OperationFinished { id: OperationId, succeeded: bool },
    StageFinished { stage_index: usize },
    RequestFinished,
}
