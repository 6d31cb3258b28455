//! The Operation Planner (spec §4.D): builds the DAG, rejects cycles,
//! levels it into stages, and computes the critical path plus advisory
//! groupings.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use tracing::instrument;

use engine_core::collections::FxHashMap;
use engine_core::ids::OperationId;
use engine_core::model::Operation;

use crate::duration::estimate;
use crate::errors::{PlanError, PlanResult};
use crate::grouping::{dependency_chain_groups, locality_groups, type_groups};
use crate::types::{ExecutionPlan, Stage};

/// The request with ids assigned, paired with its computed plan.
pub struct PlannedRequest {
    pub operations: Vec<Operation>,
    pub plan: ExecutionPlan,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Assign stable ids to any operation lacking one, build the DAG, and
/// produce the full execution plan (spec §4.D steps 1-7).
#[instrument(skip(operations))]
pub fn plan(mut operations: Vec<Operation>) -> PlanResult<PlannedRequest> {
    for op in &mut operations {
        if op.envelope.id.is_none() {
            op.envelope.id = Some(OperationId::generate());
        }
    }

    let ids: Vec<OperationId> = operations
        .iter()
        .map(|op| op.envelope.id.clone().expect("assigned above"))
        .collect();

    let mut graph: DiGraph<OperationId, ()> = DiGraph::with_capacity(operations.len(), operations.len());
    let mut node_of: FxHashMap<OperationId, NodeIndex> = FxHashMap::default();
    for id in &ids {
        let node = graph.add_node(id.clone());
        node_of.insert(id.clone(), node);
    }

    let mut order_of: FxHashMap<NodeIndex, usize> = FxHashMap::default();
    for (idx, id) in ids.iter().enumerate() {
        order_of.insert(node_of[id], idx);
    }

    // Step 2: edges. Unknown predecessor ids are silently ignored — they
    // are treated as already satisfied (spec §9 Open Question).
    for op in &operations {
        let Some(op_id) = op.envelope.id.as_ref() else { continue };
        let &to = &node_of[op_id];
        for dep in &op.envelope.depends_on {
            if let Some(&from) = node_of.get(dep) {
                graph.add_edge(from, to, ());
            }
        }
    }

    // Step 3: cycle detection via tri-colour DFS, reporting the actual
    // offending cycle (not just SCC membership) for the error detail.
    if let Some(cycle) = find_cycle(&graph) {
        return Err(PlanError::CircularDependency(cycle));
    }

    // Step 4: stage leveling by Kahn's algorithm.
    let stages_nodes = level_stages(&graph, &order_of);

    let kind_of: FxHashMap<OperationId, &engine_core::model::OperationKind> =
        operations.iter().map(|op| (op.envelope.id.clone().unwrap(), &op.kind)).collect();

    let stages: Vec<Stage> = stages_nodes
        .iter()
        .map(|nodes| {
            let mut ops: Vec<OperationId> = nodes.iter().map(|&n| graph[n].clone()).collect();
            ops.sort_by_key(|id| order_of[&node_of[id]]);
            let estimated_duration_ms = ops
                .iter()
                .map(|id| estimate(kind_of[id]))
                .max()
                .unwrap_or(0);
            Stage {
                can_run_in_parallel: ops.len() > 1,
                operations: ops,
                estimated_duration_ms,
            }
        })
        .collect();

    let parallelization_opportunities = stages.iter().filter(|s| s.can_run_in_parallel).count();
    let total_estimated_duration_ms = stages.iter().map(|s| s.estimated_duration_ms).sum();

    // Step 5: critical path, longest weighted path, ties broken by
    // earliest request order.
    let critical_path = critical_path(&graph, &order_of, &kind_of);

    // Step 6: advisory groupings.
    let ops_by_id: Vec<(OperationId, Operation)> =
        operations.iter().map(|op| (op.envelope.id.clone().unwrap(), op.clone())).collect();

    let mut groups = locality_groups(&ops_by_id);
    groups.extend(type_groups(&ops_by_id));
    groups.extend(dependency_chain_groups(&graph, &order_of));

    let exec_plan = ExecutionPlan {
        stages,
        groups,
        critical_path,
        parallelization_opportunities,
        total_estimated_duration_ms,
    };

    Ok(PlannedRequest { operations, plan: exec_plan })
}

fn find_cycle(graph: &DiGraph<OperationId, ()>) -> Option<Vec<OperationId>> {
    let mut color = vec![Color::White; graph.node_count()];
    let mut stack: Vec<NodeIndex> = Vec::new();

    for start in graph.node_indices() {
        if color[start.index()] != Color::White {
            continue;
        }
        if let Some(cycle) = visit(graph, start, &mut color, &mut stack) {
            return Some(cycle);
        }
    }
    None
}

fn visit(
    graph: &DiGraph<OperationId, ()>,
    node: NodeIndex,
    color: &mut [Color],
    stack: &mut Vec<NodeIndex>,
) -> Option<Vec<OperationId>> {
    color[node.index()] = Color::Gray;
    stack.push(node);

    for next in graph.neighbors_directed(node, Direction::Outgoing) {
        match color[next.index()] {
            Color::White => {
                if let Some(cycle) = visit(graph, next, color, stack) {
                    return Some(cycle);
                }
            }
            Color::Gray => {
                let start = stack.iter().position(|&n| n == next).unwrap_or(0);
                let mut cycle: Vec<OperationId> = stack[start..].iter().map(|&n| graph[n].clone()).collect();
                cycle.push(graph[next].clone());
                return Some(cycle);
            }
            Color::Black => {}
        }
    }

    stack.pop();
    color[node.index()] = Color::Black;
    None
}

fn level_stages(
    graph: &DiGraph<OperationId, ()>,
    order_of: &FxHashMap<NodeIndex, usize>,
) -> Vec<Vec<NodeIndex>> {
    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();

    let mut remaining: std::collections::HashSet<NodeIndex> = graph.node_indices().collect();
    let mut stages = Vec::new();

    while !remaining.is_empty() {
        let mut frontier: Vec<NodeIndex> = remaining
            .iter()
            .copied()
            .filter(|n| in_degree[n.index()] == 0)
            .collect();
        frontier.sort_by_key(|n| order_of.get(n).copied().unwrap_or(usize::MAX));

        for &n in &frontier {
            remaining.remove(&n);
            for succ in graph.neighbors_directed(n, Direction::Outgoing) {
                if remaining.contains(&succ) {
                    in_degree[succ.index()] = in_degree[succ.index()].saturating_sub(1);
                }
            }
        }
        stages.push(frontier);
    }

    stages
}

fn critical_path(
    graph: &DiGraph<OperationId, ()>,
    order_of: &FxHashMap<NodeIndex, usize>,
    kind_of: &FxHashMap<OperationId, &engine_core::model::OperationKind>,
) -> Vec<OperationId> {
    let topo = petgraph::algo::toposort(graph, None).unwrap_or_default();

    let mut dist: FxHashMap<NodeIndex, u64> = FxHashMap::default();
    let mut best_pred: FxHashMap<NodeIndex, Option<NodeIndex>> = FxHashMap::default();

    for &node in &topo {
        let own_weight = estimate(kind_of[&graph[node]]);
        let preds: Vec<_> = graph.neighbors_directed(node, Direction::Incoming).collect();

        if preds.is_empty() {
            dist.insert(node, own_weight);
            best_pred.insert(node, None);
            continue;
        }

        let mut chosen: Option<NodeIndex> = None;
        let mut chosen_dist = 0u64;
        for &pred in &preds {
            let pred_dist = dist[&pred];
            let better = match chosen {
                None => true,
                Some(current) => {
                    (pred_dist, std::cmp::Reverse(order_of[&pred])) > (chosen_dist, std::cmp::Reverse(order_of[&current]))
                }
            };
            if better {
                chosen = Some(pred);
                chosen_dist = pred_dist;
            }
        }

        dist.insert(node, chosen_dist + own_weight);
        best_pred.insert(node, chosen);
    }

    let end = topo
        .iter()
        .copied()
        .max_by_key(|n| (dist.get(n).copied().unwrap_or(0), std::cmp::Reverse(order_of[n])))
        .or_else(|| topo.first().copied());

    let Some(mut current) = end else { return Vec::new() };
    let mut path = vec![current];
    while let Some(Some(pred)) = best_pred.get(&current) {
        path.push(*pred);
        current = *pred;
    }
    path.reverse();
    path.into_iter().map(|n| graph[n].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::model::{AnalyzePayload, EditPayload, FileEdit, OperationEnvelope, OperationKind};

    fn op(id: &str, depends_on: &[&str], kind: OperationKind) -> Operation {
        Operation {
            envelope: OperationEnvelope {
                id: Some(OperationId::from(id)),
                depends_on: depends_on.iter().map(|d| OperationId::from(*d)).collect(),
                transaction: None,
            },
            kind,
        }
    }

    fn analyze(paths: &[&str]) -> OperationKind {
        OperationKind::Analyze(AnalyzePayload {
            paths: paths.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        })
    }

    fn edit(file: &str) -> OperationKind {
        OperationKind::Edit(EditPayload {
            edits: vec![FileEdit { file: file.to_string(), changes: vec![] }],
            ..Default::default()
        })
    }

    #[test]
    fn parallel_stages_scenario() {
        // Scenario 1: A(analyze /src), B(analyze /test), C(edit, deps=[A,B]).
        let ops = vec![
            op("A", &[], analyze(&["/src"])),
            op("B", &[], analyze(&["/test"])),
            op("C", &["A", "B"], edit("/src/x.rs")),
        ];
        let planned = plan(ops).unwrap();
        let plan = planned.plan;

        assert_eq!(plan.stages.len(), 2);
        assert_eq!(plan.stages[0].operations.len(), 2);
        assert!(plan.stages[0].can_run_in_parallel);
        assert_eq!(plan.stages[1].operations, vec![OperationId::from("C")]);
        assert_eq!(plan.parallelization_opportunities, 1);
        assert!(plan.critical_path.contains(&OperationId::from("C")));
    }

    #[test]
    fn cycle_rejected_scenario() {
        // Scenario 2: X(analyze, deps=[Y]), Y(edit, deps=[X]).
        let ops = vec![
            op("X", &["Y"], analyze(&["/a"])),
            op("Y", &["X"], edit("/a/f.rs")),
        ];
        let err = plan(ops).unwrap_err();
        assert!(matches!(err, PlanError::CircularDependency(_)));
    }

    #[test]
    fn unknown_dependency_is_silently_satisfied() {
        let ops = vec![op("A", &["ghost"], analyze(&["/a"]))];
        let planned = plan(ops).unwrap();
        assert_eq!(planned.plan.stages.len(), 1);
        assert_eq!(planned.plan.stages[0].operations, vec![OperationId::from("A")]);
    }

    #[test]
    fn every_operation_appears_in_exactly_one_stage() {
        let ops = vec![
            op("A", &[], analyze(&["/a"])),
            op("B", &["A"], analyze(&["/b"])),
            op("C", &["A"], analyze(&["/c"])),
            op("D", &["B", "C"], edit("/d")),
        ];
        let planned = plan(ops).unwrap();
        let mut seen: Vec<OperationId> = planned.plan.stages.iter().flat_map(|s| s.operations.clone()).collect();
        seen.sort();
        assert_eq!(seen, vec!["A", "B", "C", "D"].into_iter().map(OperationId::from).collect::<Vec<_>>());
    }

    #[test]
    fn planning_is_idempotent() {
        let ops = vec![
            op("A", &[], analyze(&["/a"])),
            op("B", &["A"], edit("/a/f.rs")),
        ];
        let first = plan(ops.clone()).unwrap();
        let second = plan(ops).unwrap();
        assert_eq!(
            serde_json::to_value(&first.plan).unwrap(),
            serde_json::to_value(&second.plan).unwrap()
        );
    }
}
