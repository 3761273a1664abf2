//! Data-flow graph construction.
//!
//! Collects every name reference of every scope, normalizes them into one
//! global scan order (ascending scope id, then source line, reads before
//! writes within a line) and builds forward def-use chains in a single pass:
//! each write chains to the run of reads observing its value, and the chain
//! stops at the next write or delete of the same identifier. Because the scan
//! order concatenates scopes, a write in an earlier cell legitimately chains
//! to a read in a later cell.

use serde::{Deserialize, Serialize};

use crate::tree::{AccessMode, RefId, Scope, StatementTree};

/// A def-use edge: the value produced or observed at `from` may be observed
/// at `to`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DfgEdge {
    pub from: RefId,
    pub to: RefId,
}

/// Data-flow graph spanning every scope of one analyzed program
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFlowGraph {
    pub edges: Vec<DfgEdge>,
}

impl DataFlowGraph {
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Edges whose endpoints reference `name`
    pub fn edges_for<'a>(
        &'a self,
        tree: &'a StatementTree,
        name: &'a str,
    ) -> impl Iterator<Item = DfgEdge> + 'a {
        self.edges
            .iter()
            .copied()
            .filter(move |e| tree.reference(e.from).name == name)
    }

    /// Whether any edge originates at `reference`
    pub fn has_source(&self, reference: RefId) -> bool {
        self.edges.iter().any(|e| e.from == reference)
    }
}

/// Build def-use chains over `scopes`, ordered by ascending scope id.
pub fn build_dfg(tree: &StatementTree, scopes: &[Scope]) -> DataFlowGraph {
    let order = scan_order(tree, scopes);
    DataFlowGraph {
        edges: chain_edges(tree, &order),
    }
}

/// The global reference sequence: scopes concatenated in ascending id order,
/// references within a scope ordered by line, and within one line all reads
/// preceding all writes and deletes (evaluation before assignment). Column
/// keeps occurrences sharing a line and mode in deterministic order.
fn scan_order(tree: &StatementTree, scopes: &[Scope]) -> Vec<RefId> {
    let mut ordered_scopes: Vec<&Scope> = scopes.iter().collect();
    ordered_scopes.sort_by_key(|s| s.id);

    let mut order = Vec::new();
    for scope in ordered_scopes {
        let mut refs = tree.subtree_refs(scope.root);
        refs.sort_by_key(|&r| {
            let reference = tree.reference(r);
            (reference.line, mode_rank(reference.mode), reference.column)
        });
        order.extend(refs);
    }
    order
}

fn mode_rank(mode: AccessMode) -> u8 {
    match mode {
        AccessMode::Read => 0,
        AccessMode::Write | AccessMode::Delete => 1,
    }
}

/// Single forward scan over the global sequence. For each write, the first
/// later same-identifier reference decides the outcome: absent means the
/// value is never observed, a write or delete means a dead store, a read
/// starts a chain extended read-to-read until the next write or delete.
fn chain_edges(tree: &StatementTree, order: &[RefId]) -> Vec<DfgEdge> {
    let mut edges = Vec::new();

    for (pos, &write) in order.iter().enumerate() {
        if tree.reference(write).mode != AccessMode::Write {
            continue;
        }
        let name = &tree.reference(write).name;
        let mut rest = order[pos + 1..]
            .iter()
            .copied()
            .filter(|&r| tree.reference(r).name == *name);

        let Some(first) = rest.next() else { continue };
        if tree.reference(first).mode != AccessMode::Read {
            continue;
        }
        edges.push(DfgEdge {
            from: write,
            to: first,
        });

        let mut prev = first;
        for next in rest {
            if tree.reference(next).mode != AccessMode::Read {
                break;
            }
            edges.push(DfgEdge {
                from: prev,
                to: next,
            });
            prev = next;
        }
    }
    edges
}
