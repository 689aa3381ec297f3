//! Iterative dominator computation.
//!
//! Standard fixed point over bit sets: every node's dominator set starts as "all
//! nodes" (Entry's as itself only), then `Dom(n) = {n} ∪ ⋂ Dom(p)` over predecessors
//! `p` is applied until no set changes. Dominance underlies loop raising (a loop
//! header dominates its whole body) and conditional joins (nearest common dominator
//! of the two branches).

use crate::graph::{bitset::BitSet, node::BranchNode, NodeId};

/// Computes the dominator set of every node.
///
/// Unreachable nodes keep the initial "all nodes" set, which is harmless: the
/// builder only creates reachable nodes, and the structurer never visits a node
/// the entry cannot reach.
pub(crate) fn compute(nodes: &[BranchNode], entry: NodeId) -> Vec<BitSet> {
    let count = nodes.len();
    let mut dominators: Vec<BitSet> = (0..count)
        .map(|idx| {
            if idx == entry.index() {
                let mut set = BitSet::new(count);
                set.insert(idx);
                set
            } else {
                BitSet::full(count)
            }
        })
        .collect();

    let mut changed = true;
    while changed {
        changed = false;

        for node in nodes {
            let idx = node.id.index();
            if idx == entry.index() {
                continue;
            }

            let mut updated = BitSet::full(count);
            let mut has_pred = false;
            for pred in &node.predecessors {
                updated.intersect_with(&dominators[pred.index()]);
                has_pred = true;
            }
            if !has_pred {
                // No predecessors and not Entry: unreachable, leave as-is.
                continue;
            }
            updated.insert(idx);

            if updated != dominators[idx] {
                dominators[idx] = updated;
                changed = true;
            }
        }
    }

    dominators
}
