//! The request/response data model (spec §3, §6).
//!
//! `Operation` is a closed sum type dispatched on tag, not a class
//! hierarchy (spec §9 design note). Shared behaviour — id, dependency
//! edges, transaction tag — lives in [`OperationEnvelope`], which every
//! variant carries, rather than being duplicated per kind.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::RequestOptions;
use crate::errors::ErrorEnvelope;
use crate::ids::{OperationId, TransactionId};

// ─── Operation envelope ────────────────────────────────────────────────

/// Fields every operation carries, regardless of kind (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationEnvelope {
    /// Client-supplied or engine-generated id, stable within the request.
    #[serde(default)]
    pub id: Option<OperationId>,
    /// Ids of predecessor operations. Unknown ids are silently treated
    /// as already-satisfied (spec §9 Open Question, resolved: accept).
    #[serde(default)]
    pub depends_on: Vec<OperationId>,
    /// Opaque transactional group tag.
    #[serde(default)]
    pub transaction: Option<TransactionId>,
}

impl Default for OperationEnvelope {
    fn default() -> Self {
        Self {
            id: None,
            depends_on: Vec::new(),
            transaction: None,
        }
    }
}

// ─── Operation payloads ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalyzePayload {
    pub paths: Vec<String>,
    pub search: Option<String>,
    pub patterns: Option<Vec<String>>,
    pub extract: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileChange {
    /// Literal or regex find/replace.
    pub find: Option<String>,
    pub replace: Option<String>,
    pub regex: Option<bool>,
    /// Insert/replace/delete by 1-based line number.
    pub line: Option<usize>,
    pub line_end: Option<usize>,
    pub content: Option<String>,
    pub op: Option<ChangeOp>,
    /// Insert at a byte offset instead of a line.
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    FindReplace,
    InsertLine,
    ReplaceLine,
    DeleteLine,
    InsertOffset,
    AstRewrite,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileEdit {
    pub file: String,
    pub changes: Vec<FileChange>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EditPayload {
    pub edits: Vec<FileEdit>,
    pub dry_run: Option<bool>,
    pub create_backup: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NewFile {
    pub path: String,
    pub content: String,
    pub encoding: Option<String>,
    pub mode: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CreatePayload {
    pub files: Vec<NewFile>,
    pub overwrite: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DeletePayload {
    pub paths: Vec<String>,
    pub remove_empty_dirs: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ValidatePayload {
    pub files: Option<Vec<String>>,
    pub commands: Option<Vec<String>>,
    pub checks: Option<Vec<String>>,
    pub fix: Option<bool>,
}

/// The closed sum type of operation kinds (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationKind {
    Analyze(AnalyzePayload),
    Edit(EditPayload),
    Create(CreatePayload),
    Delete(DeletePayload),
    Validate(ValidatePayload),
}

impl OperationKind {
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::Analyze(_) => "analyze",
            OperationKind::Edit(_) => "edit",
            OperationKind::Create(_) => "create",
            OperationKind::Delete(_) => "delete",
            OperationKind::Validate(_) => "validate",
        }
    }
}

/// One operation: the shared envelope plus a kind-specific payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    #[serde(flatten)]
    pub envelope: OperationEnvelope,
    #[serde(flatten)]
    pub kind: OperationKind,
}

impl Operation {
    pub fn id(&self) -> Option<&OperationId> {
        self.envelope.id.as_ref()
    }
}

// ─── Request / Response ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub options: RequestOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Success,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult {
    pub id: OperationId,
    pub kind: String,
    pub status: OperationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
    pub duration_ms: u64,
}

impl OperationResult {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResponseSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheStatsSummary {
    pub hits: u64,
    pub misses: u64,
    pub bytes: u64,
    pub entries: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PerformanceSummary {
    pub parallelization_opportunities: usize,
    pub critical_path: Vec<OperationId>,
    pub cache: CacheStatsSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    pub operations: Vec<OperationResult>,
    pub summary: ResponseSummary,
    pub performance: PerformanceSummary,
}

/// Arbitrary per-operation aggregated data, used by Analyze/Validate
/// results that need more structure than a flat JSON blob built ad hoc.
pub type Aggregate = HashMap<String, serde_json::Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_round_trips_through_json() {
        let op = Operation {
            envelope: OperationEnvelope {
                id: Some(OperationId::from("A")),
                depends_on: vec![OperationId::from("B")],
                transaction: Some(TransactionId::from("T1")),
            },
            kind: OperationKind::Analyze(AnalyzePayload {
                paths: vec!["src/lib.rs".into()],
                ..Default::default()
            }),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "analyze");
        assert_eq!(json["id"], "A");
        assert_eq!(json["transaction"], "T1");

        let back: Operation = serde_json::from_value(json).unwrap();
        assert_eq!(back.id(), Some(&OperationId::from("A")));
        assert!(matches!(back.kind, OperationKind::Analyze(_)));
    }

    #[test]
    fn missing_envelope_fields_default() {
        let json = serde_json::json!({ "type": "delete", "paths": ["a.txt"] });
        let op: Operation = serde_json::from_value(json).unwrap();
        assert!(op.envelope.id.is_none());
        assert!(op.envelope.depends_on.is_empty());
    }
}
