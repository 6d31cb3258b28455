//! # engine-plan
//!
//! The Operation Planner (spec §4.D): turns a flat operation list into
//! a dependency DAG, rejects cycles, levels it into parallel-safe
//! stages, computes the critical path, and emits advisory groupings.

pub mod duration;
pub mod errors;
pub mod grouping;
pub mod planner;
pub mod types;

pub use errors::PlanError;
pub use planner::{plan, PlannedRequest};
pub use types::{ExecutionPlan, GroupType, OperationGroup, Stage};
