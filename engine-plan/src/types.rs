//! The planner's output shape (spec §4.D `ExecutionPlan`).

use serde::{Deserialize, Serialize};

use engine_core::ids::OperationId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub operations: Vec<OperationId>,
    pub can_run_in_parallel: bool,
    pub estimated_duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupType {
    Locality,
    OperationType,
    DependencyChain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationGroup {
    pub group_type: GroupType,
    pub operations: Vec<OperationId>,
    pub can_parallelise: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub stages: Vec<Stage>,
    pub groups: Vec<OperationGroup>,
    pub critical_path: Vec<OperationId>,
    pub parallelization_opportunities: usize,
    pub total_estimated_duration_ms: u64,
}
