//! The three advisory groupings emitted alongside the stage schedule
//! (spec §4.D step 6): locality, operation-type, and linear
//! dependency-chains. None of these gate execution order — they are
//! hints a scheduler-aware caller can use to colocate work.

use std::collections::HashMap;

use engine_core::collections::FxHashMap;
use engine_core::ids::OperationId;
use engine_core::model::{Operation, OperationKind};
use petgraph::graph::NodeIndex;
use petgraph::Direction;

use crate::types::{GroupType, OperationGroup};

/// Paths an operation touches, for the locality grouping. Order is not
/// significant here; duplicates are fine since this only feeds a
/// group-by-path map.
pub fn touched_paths(kind: &OperationKind) -> Vec<&str> {
    match kind {
        OperationKind::Analyze(p) => p.paths.iter().map(String::as_str).collect(),
        OperationKind::Edit(p) => p.edits.iter().map(|e| e.file.as_str()).collect(),
        OperationKind::Create(p) => p.files.iter().map(|f| f.path.as_str()).collect(),
        OperationKind::Delete(p) => p.paths.iter().map(String::as_str).collect(),
        OperationKind::Validate(p) => p.files.as_deref().unwrap_or_default().iter().map(String::as_str).collect(),
    }
}

pub fn locality_groups(ops: &[(OperationId, Operation)]) -> Vec<OperationGroup> {
    let mut by_path: HashMap<&str, Vec<OperationId>> = HashMap::new();
    for (id, op) in ops {
        for path in touched_paths(&op.kind) {
            by_path.entry(path).or_default().push(id.clone());
        }
    }
    by_path
        .into_values()
        .filter(|ids| ids.len() > 1)
        .map(|ids| OperationGroup {
            group_type: GroupType::Locality,
            can_parallelise: false,
            operations: ids,
        })
        .collect()
}

pub fn type_groups(ops: &[(OperationId, Operation)]) -> Vec<OperationGroup> {
    let mut by_kind: HashMap<&'static str, Vec<OperationId>> = HashMap::new();
    for (id, op) in ops {
        by_kind.entry(op.kind.name()).or_default().push(id.clone());
    }
    by_kind
        .into_values()
        .filter(|ids| ids.len() > 1)
        .map(|ids| OperationGroup {
            group_type: GroupType::OperationType,
            can_parallelise: true,
            operations: ids,
        })
        .collect()
}

/// Maximal linear runs: a node continues a chain with its predecessor
/// when it has exactly one predecessor and that predecessor has
/// exactly one successor (a 1:1 edge in both directions).
pub fn dependency_chain_groups(
    graph: &petgraph::graph::DiGraph<OperationId, ()>,
    node_order: &FxHashMap<NodeIndex, usize>,
) -> Vec<OperationGroup> {
    let mut visited = vec![false; graph.node_count()];
    let mut chains = Vec::new();

    let mut starts: Vec<NodeIndex> = graph.node_indices().collect();
    starts.sort_by_key(|n| node_order.get(n).copied().unwrap_or(usize::MAX));

    for start in starts {
        if visited[start.index()] {
            continue;
        }
        // Only begin a chain at a node that isn't itself a 1:1 successor
        // of its predecessor, so each chain is walked from its head.
        let preds: Vec<_> = graph.neighbors_directed(start, Direction::Incoming).collect();
        if preds.len() == 1 {
            let pred = preds[0];
            let pred_succs = graph.neighbors_directed(pred, Direction::Outgoing).count();
            if pred_succs == 1 {
                continue;
            }
        }

        let mut chain = vec![start];
        visited[start.index()] = true;
        let mut current = start;
        loop {
            let succs: Vec<_> = graph.neighbors_directed(current, Direction::Outgoing).collect();
            if succs.len() != 1 {
                break;
            }
            let next = succs[0];
            let next_preds = graph.neighbors_directed(next, Direction::Incoming).count();
            if next_preds != 1 || visited[next.index()] {
                break;
            }
            chain.push(next);
            visited[next.index()] = true;
            current = next;
        }

        if chain.len() > 1 {
            chains.push(OperationGroup {
                group_type: GroupType::DependencyChain,
                can_parallelise: false,
                operations: chain.into_iter().map(|n| graph[n].clone()).collect(),
            });
        }
    }

    chains
}
