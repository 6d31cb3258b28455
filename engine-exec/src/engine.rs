//! `Engine` — stage-wise dispatch of the five operation kinds (spec
//! §4.F). Each stage's operations are fanned out across a bounded
//! `rayon::ThreadPool` sized to `options.concurrency`, mirroring the
//! teacher's `scanner::walker::walk_directory` parallel-fan-out idiom
//! and its `cancelled: &AtomicBool` suspension-point checks. Stages
//! themselves form a barrier: all of stage *k* complete before any of
//! stage *k+1* starts (spec §5 ordering guarantee).

use std::collections::HashMap;
use std::time::Instant;

use dashmap::DashSet;
use engine_core::errors::{ErrorCode, ErrorCoded, ErrorEnvelope};
use engine_core::ids::{OperationId, TransactionId};
use engine_core::model::{
    Operation, OperationResult, OperationStatus, PerformanceSummary, Request, Response,
    ResponseSummary,
};
use engine_core::progress::ProgressEvent;
use engine_core::CancellationToken;
use engine_plan::plan as build_plan;
use rayon::ThreadPoolBuilder;
use tracing::instrument;

use crate::context::ExecContext;
use crate::creator::Creator;
use crate::deleter::Deleter;
use crate::editor::Editor;
use crate::errors::ExecError;
use crate::handler::OperationHandler;
use crate::validator::Validator;
use crate::Analyzer;

/// Per-operation runtime status tracked as the engine walks stages, so
/// later stages can tell whether an op's predecessors all succeeded
/// (spec §8 invariant: a cancelled/failed predecessor cancels a node).
#[derive(Clone, Copy, PartialEq, Eq)]
enum RunStatus {
    Success,
    Failed,
    Cancelled,
}

pub struct Engine;

impl Engine {
    /// Plan and execute `request` against `ctx`, reporting progress
    /// through `progress` (never blocked on) and honouring
    /// `ctx.cancellation` at every suspension point.
    #[instrument(skip(ctx, progress, request))]
    pub fn execute(
        ctx: &ExecContext,
        request: Request,
        progress: impl Fn(ProgressEvent) + Send + Sync,
    ) -> Response {
        let start = Instant::now();
        let timeout_ms = request.options.effective_timeout_ms();
        let concurrency = request.options.effective_concurrency().max(1);

        let planned = match build_plan(request.operations) {
            Ok(planned) => planned,
            Err(err) => {
                tracing::error!(error = %err, "planning failed");
                return Response {
                    success: false,
                    operations: Vec::new(),
                    summary: ResponseSummary { elapsed_ms: elapsed_ms(start), ..Default::default() },
                    performance: PerformanceSummary::default(),
                };
            }
        };

        let ops_by_id: HashMap<OperationId, Operation> = planned
            .operations
            .into_iter()
            .map(|op| (op.envelope.id.clone().expect("planner assigns ids"), op))
            .collect();

        let pool = ThreadPoolBuilder::new()
            .num_threads(concurrency)
            .build()
            .unwrap_or_else(|_| ThreadPoolBuilder::new().build().expect("default rayon pool"));

        let mut run_status: HashMap<OperationId, RunStatus> = HashMap::new();
        let mut results: Vec<OperationResult> = Vec::with_capacity(ops_by_id.len());
        let mut index_of: HashMap<OperationId, usize> = HashMap::new();
        let rolled_back: DashSet<TransactionId> = DashSet::new();

        'stages: for (stage_index, stage) in planned.plan.stages.iter().enumerate() {
            progress(ProgressEvent::StageStarted {
                stage_index,
                operation_count: stage.operations.len(),
            });

            let timed_out = timeout_ms.map(|ms| start.elapsed().as_millis() as u64 >= ms).unwrap_or(false);
            let cancelled_before_stage = ctx.cancellation.is_cancelled();

            if timed_out || cancelled_before_stage {
                for remaining_stage in &planned.plan.stages[stage_index..] {
                    for id in &remaining_stage.operations {
                        let op = &ops_by_id[id];
                        let status = if timed_out { OperationStatus::Failed } else { OperationStatus::Cancelled };
                        let error = if timed_out {
                            Some(ErrorEnvelope::new(ErrorCode::Timeout, "request timeout exceeded"))
                        } else {
                            Some(ErrorEnvelope::new(ErrorCode::Cancelled, "request cancelled"))
                        };
                        push_result(&mut results, &mut index_of, id.clone(), op.kind.name(), status, None, error, 0);
                        run_status.insert(id.clone(), if timed_out { RunStatus::Failed } else { RunStatus::Cancelled });
                    }
                }
                break 'stages;
            }

            let runnable: Vec<&OperationId> = stage
                .operations
                .iter()
                .filter(|&id| {
                    let op = &ops_by_id[id];
                    predecessors_ok(op, &run_status) && !tx_already_failed(op, &rolled_back)
                })
                .collect();

            let skipped: Vec<&OperationId> = stage
                .operations
                .iter()
                .filter(|id| !runnable.contains(id))
                .collect();

            for id in skipped {
                let op = &ops_by_id[id];
                push_result(
                    &mut results,
                    &mut index_of,
                    id.clone(),
                    op.kind.name(),
                    OperationStatus::Cancelled,
                    None,
                    Some(ErrorEnvelope::new(ErrorCode::Cancelled, "predecessor did not succeed, or transaction rolled back")),
                    0,
                );
                run_status.insert(id.clone(), RunStatus::Cancelled);
            }

            for &id in &runnable {
                if let Some(tx_id) = &ops_by_id[id].envelope.transaction {
                    ctx.tx.begin(tx_id);
                }
            }

            let stage_outcomes: Vec<(OperationId, OperationResult, RunStatus)> = pool.install(|| {
                use rayon::prelude::*;
                runnable
                    .par_iter()
                    .map(|&id| {
                        let op = &ops_by_id[id];
                        progress(ProgressEvent::OperationStarted { id: id.clone() });
                        let (result, status) = run_one(ctx, op);
                        progress(ProgressEvent::OperationFinished { id: id.clone(), succeeded: status == RunStatus::Success });
                        (id.clone(), result, status)
                    })
                    .collect()
            });

            let mut tx_failed_this_stage: Vec<TransactionId> = Vec::new();
            for (id, result, status) in stage_outcomes {
                if status == RunStatus::Failed {
                    if let Some(tx_id) = &ops_by_id[&id].envelope.transaction {
                        if !rolled_back.contains(tx_id) {
                            tx_failed_this_stage.push(tx_id.clone());
                        }
                    }
                }
                run_status.insert(id.clone(), status);
                push_result_full(&mut results, &mut index_of, result);
            }

            tx_failed_this_stage.sort_by(|a, b| a.0.cmp(&b.0));
            tx_failed_this_stage.dedup();
            for tx_id in tx_failed_this_stage {
                if !rolled_back.insert(tx_id.clone()) {
                    continue;
                }
                if ctx.tx.is_active(&tx_id) {
                    match ctx.tx.rollback(&tx_id, &ctx.fs) {
                        Ok(report) => {
                            if !report.failures.is_empty() {
                                tracing::warn!(tx = %tx_id, failures = report.failures.len(), "rollback completed with failures");
                            }
                        }
                        Err(err) => tracing::error!(tx = %tx_id, error = %err, "rollback itself failed"),
                    }
                }
                // Retroactively mark every already-succeeded sibling in
                // this transaction as rolled back (spec §8: "every
                // successful sibling has been undone").
                for (other_id, other_op) in &ops_by_id {
                    if other_op.envelope.transaction.as_ref() != Some(&tx_id) {
                        continue;
                    }
                    if run_status.get(other_id) != Some(&RunStatus::Success) {
                        continue;
                    }
                    run_status.insert(other_id.clone(), RunStatus::Cancelled);
                    if let Some(&idx) = index_of.get(other_id) {
                        results[idx].status = OperationStatus::Cancelled;
                        results[idx].data = None;
                        results[idx].error = Some(ErrorEnvelope::new(
                            ErrorCode::Cancelled,
                            "rolled back: a sibling operation in this transaction failed",
                        ));
                    }
                }
            }

            progress(ProgressEvent::StageFinished { stage_index });
        }

        progress(ProgressEvent::RequestFinished);

        let cache_stats = ctx.cache.stats();
        let succeeded = results.iter().filter(|r| r.status == OperationStatus::Success).count();
        let failed = results.iter().filter(|r| r.status == OperationStatus::Failed).count();
        let cancelled = results.iter().filter(|r| r.status == OperationStatus::Cancelled).count();

        Response {
            success: failed == 0,
            operations: results,
            summary: ResponseSummary {
                total: ops_by_id.len(),
                succeeded,
                failed,
                cancelled,
                elapsed_ms: elapsed_ms(start),
            },
            performance: PerformanceSummary {
                parallelization_opportunities: planned.plan.parallelization_opportunities,
                critical_path: planned.plan.critical_path,
                cache: engine_core::model::CacheStatsSummary {
                    hits: cache_stats.hits,
                    misses: cache_stats.misses,
                    bytes: cache_stats.bytes,
                    entries: cache_stats.entries,
                },
            },
        }
    }
}

fn predecessors_ok(op: &Operation, run_status: &HashMap<OperationId, RunStatus>) -> bool {
    op.envelope.depends_on.iter().all(|dep| match run_status.get(dep) {
        // Unknown ids (not in run_status because they weren't in the
        // request) are treated as already-satisfied (spec §9 Open
        // Question, fixed policy).
        None => true,
        Some(RunStatus::Success) => true,
        Some(RunStatus::Failed) | Some(RunStatus::Cancelled) => false,
    })
}

fn tx_already_failed(op: &Operation, rolled_back: &DashSet<TransactionId>) -> bool {
    op.envelope
        .transaction
        .as_ref()
        .map(|tx| rolled_back.contains(tx))
        .unwrap_or(false)
}

fn run_one(ctx: &ExecContext, op: &Operation) -> (OperationResult, RunStatus) {
    let op_start = Instant::now();
    let id = op.envelope.id.clone().expect("planner assigns ids");
    let kind_name = op.kind.name();

    if ctx.check_cancelled() {
        let result = OperationResult {
            id: id.clone(),
            kind: kind_name.to_string(),
            status: OperationStatus::Cancelled,
            data: None,
            error: Some(ErrorEnvelope::new(ErrorCode::Cancelled, "cancelled before dispatch")),
            duration_ms: elapsed_ms(op_start),
        };
        return (result, RunStatus::Cancelled);
    }

    let outcome = dispatch(ctx, op);
    let duration_ms = elapsed_ms(op_start);

    match outcome {
        Ok(data) => (
            OperationResult {
                id,
                kind: kind_name.to_string(),
                status: OperationStatus::Success,
                data: Some(data),
                error: None,
                duration_ms,
            },
            RunStatus::Success,
        ),
        Err(ExecError::Cancelled) => (
            OperationResult {
                id,
                kind: kind_name.to_string(),
                status: OperationStatus::Cancelled,
                data: None,
                error: Some(ErrorEnvelope::new(ErrorCode::Cancelled, "cancelled mid-flight")),
                duration_ms,
            },
            RunStatus::Cancelled,
        ),
        Err(err) => (
            OperationResult {
                id,
                kind: kind_name.to_string(),
                status: OperationStatus::Failed,
                data: None,
                error: Some(ErrorEnvelope::from_error(&err)),
                duration_ms,
            },
            RunStatus::Failed,
        ),
    }
}

fn dispatch(ctx: &ExecContext, op: &Operation) -> Result<serde_json::Value, ExecError> {
    use engine_core::model::OperationKind::*;
    match &op.kind {
        Analyze(_) => Analyzer.run(ctx, op),
        Edit(_) => Editor.run(ctx, op),
        Create(_) => Creator.run(ctx, op),
        Delete(_) => Deleter.run(ctx, op),
        Validate(_) => Validator.run(ctx, op),
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn push_result(
    results: &mut Vec<OperationResult>,
    index_of: &mut HashMap<OperationId, usize>,
    id: OperationId,
    kind: &str,
    status: OperationStatus,
    data: Option<serde_json::Value>,
    error: Option<ErrorEnvelope>,
    duration_ms: u64,
) {
    index_of.insert(id.clone(), results.len());
    results.push(OperationResult { id, kind: kind.to_string(), status, data, error, duration_ms });
}

fn push_result_full(results: &mut Vec<OperationResult>, index_of: &mut HashMap<OperationId, usize>, result: OperationResult) {
    index_of.insert(result.id.clone(), results.len());
    results.push(result);
}
