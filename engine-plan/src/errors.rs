use engine_core::errors::{ErrorCode, ErrorCoded};
use engine_core::ids::OperationId;

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("operation dependency graph contains a cycle: {}", format_cycle(.0))]
    CircularDependency(Vec<OperationId>),

    #[error("planner invariant violated: {0}")]
    Internal(String),
}

fn format_cycle(ids: &[OperationId]) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(" -> ")
}

impl ErrorCoded for PlanError {
    fn code(&self) -> ErrorCode {
        match self {
            PlanError::CircularDependency(_) => ErrorCode::CircularDependency,
            PlanError::Internal(_) => ErrorCode::Internal,
        }
    }
}

pub type PlanResult<T> = Result<T, PlanError>;
