//! Access-pattern event plumbing (spec §3 "Access pattern event").
//!
//! The Execution Engine feeds one event per file touched by an
//! operation to whatever sink is configured; the Predictive Pre-loader
//! is the reference consumer, but the event shape and sink trait live
//! here so `engine-exec` never has to depend on `engine-predict`
//! (spec §9 "Predictor as a strategy" — the core only knows the
//! interface).

use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    Analyze,
    Edit,
    Create,
    Delete,
    Validate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessPatternEvent {
    pub abs_path: PathBuf,
    pub timestamp: SystemTime,
    pub op_kind: AccessKind,
    pub session_id: Option<String>,
    pub context: Option<serde_json::Value>,
}

/// Sink a file-access event flows into. Implementations must never
/// block the caller on their own I/O (spec §3 invariant: "Predictor
/// never blocks on its own I/O").
pub trait AccessEventSink: Send + Sync {
    fn record(&self, event: AccessPatternEvent);
}

/// Default sink used when no predictor is wired in.
pub struct NullEventSink;

impl AccessEventSink for NullEventSink {
    fn record(&self, _event: AccessPatternEvent) {}
}
