//! Compile-time duration-estimate table (spec §9 Open Question: units
//! are unspecified by the source; treated as opaque relative weights
//! for stage/critical-path ordering only, never as wall-clock time).

use engine_core::model::OperationKind;

const ANALYZE_WEIGHT: u64 = 200;
const EDIT_WEIGHT: u64 = 100;
const CREATE_WEIGHT: u64 = 100;
const DELETE_WEIGHT: u64 = 100;
const VALIDATE_WEIGHT: u64 = 300;

pub fn estimate(kind: &OperationKind) -> u64 {
    match kind {
        OperationKind::Analyze(_) => ANALYZE_WEIGHT,
        OperationKind::Edit(_) => EDIT_WEIGHT,
        OperationKind::Create(_) => CREATE_WEIGHT,
        OperationKind::Delete(_) => DELETE_WEIGHT,
        OperationKind::Validate(_) => VALIDATE_WEIGHT,
    }
}
