//! Branch graph nodes and the graph container.
//!
//! A [`BranchGraph`] is the control-flow graph recovered from a method's bytecode:
//! each node owns a maximal straight-line instruction run terminated by a branch,
//! return, or control-flow merge. Exactly one synthetic Entry and one synthetic Exit
//! node exist per graph, and every terminating instruction's block links to Exit.
//! Predecessor and successor edges are maintained as inverse pairs.

use std::ops::Range;

use crate::graph::bitset::BitSet;

/// Index of a node within its [`BranchGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The underlying index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Classification of a branch graph node.
///
/// `Unit` and `Conditional` are assigned from the terminator during construction;
/// `Loop` is a refinement applied once dominance is available: a node is a loop
/// header iff it dominates one of its own predecessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// The synthetic entry node; no instructions, single successor.
    Entry,
    /// The synthetic exit node; no instructions, no successors.
    Exit,
    /// A straight-line run with at most one successor.
    Unit,
    /// A run terminated by a conditional branch (two or more successors).
    Conditional,
    /// A conditional or unit node that heads a natural loop.
    Loop,
}

/// One node of the branch graph.
#[derive(Debug, Clone)]
pub struct BranchNode {
    /// This node's id.
    pub id: NodeId,
    /// Node classification.
    pub kind: NodeKind,
    /// Byte offset of the first owned instruction (0 for Entry/Exit).
    pub offset: u32,
    /// Index range of owned instructions within the method disassembly.
    /// Empty for the synthetic Entry and Exit nodes.
    pub instructions: Range<usize>,
    /// Predecessor edges (inverse of some node's successor edge).
    pub predecessors: Vec<NodeId>,
    /// Successor edges. For a conditional terminator the taken target(s) come
    /// first and the fallthrough successor is last.
    pub successors: Vec<NodeId>,
}

impl BranchNode {
    pub(crate) fn new(id: NodeId, kind: NodeKind, offset: u32) -> Self {
        BranchNode {
            id,
            kind,
            offset,
            instructions: 0..0,
            predecessors: Vec::new(),
            successors: Vec::new(),
        }
    }

    /// Whether this node is one of the two synthetic nodes.
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        matches!(self.kind, NodeKind::Entry | NodeKind::Exit)
    }
}

/// A control-flow graph of basic blocks rooted at a synthetic Entry node, with a
/// single synthetic Exit and per-node dominator sets.
#[derive(Debug)]
pub struct BranchGraph {
    pub(crate) nodes: Vec<BranchNode>,
    pub(crate) entry: NodeId,
    pub(crate) exit: NodeId,
    /// Dominator set per node, computed at construction time by the iterative
    /// fixed point in [`crate::graph::dominance`].
    pub(crate) dominators: Vec<BitSet>,
}

impl BranchGraph {
    /// The synthetic entry node id.
    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// The synthetic exit node id.
    #[must_use]
    pub fn exit(&self) -> NodeId {
        self.exit
    }

    /// Number of nodes including Entry and Exit.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph holds only the synthetic nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 2
    }

    /// The node with the given id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &BranchNode {
        &self.nodes[id.0]
    }

    /// All nodes, in creation order (Entry first, Exit second).
    #[must_use]
    pub fn nodes(&self) -> &[BranchNode] {
        &self.nodes
    }

    /// The dominator set of `id`.
    #[must_use]
    pub fn dominators(&self, id: NodeId) -> &BitSet {
        &self.dominators[id.0]
    }

    /// Whether `a` dominates `b` (every path from Entry to `b` passes through `a`).
    #[must_use]
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        self.dominators[b.0].contains(a.0)
    }

    /// Predecessors of `id` whose edge into it is a back edge (`id` dominates them).
    #[must_use]
    pub fn back_edge_sources(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .predecessors
            .iter()
            .copied()
            .filter(|&p| self.dominates(id, p))
            .collect()
    }

    /// The natural loop of `header`: the header plus every node that reaches a
    /// back-edge source without passing through the header.
    #[must_use]
    pub fn natural_loop(&self, header: NodeId) -> BitSet {
        let mut body = BitSet::new(self.nodes.len());
        body.insert(header.0);

        let mut worklist = self.back_edge_sources(header);
        while let Some(node) = worklist.pop() {
            if body.contains(node.0) {
                continue;
            }
            body.insert(node.0);
            for &pred in &self.node(node).predecessors {
                if !body.contains(pred.0) {
                    worklist.push(pred);
                }
            }
        }

        body
    }

    /// The nearest common dominator of two nodes: the deepest node that
    /// dominates both.
    #[must_use]
    pub fn nearest_common_dominator(&self, a: NodeId, b: NodeId) -> NodeId {
        let mut common = self.dominators[a.0].clone();
        common.intersect_with(&self.dominators[b.0]);

        // The deepest common dominator is the one with the largest dominator
        // set of its own (it is dominated by every other common dominator).
        let mut best = self.entry;
        let mut best_depth = 0;
        for idx in common.iter() {
            let depth = self.dominators[idx].count();
            if depth >= best_depth {
                best_depth = depth;
                best = NodeId(idx);
            }
        }
        best
    }

    /// Postdominator sets, computed on demand by running the dominance fixed
    /// point over the reversed graph rooted at Exit. The join point of a
    /// conditional is the deepest common postdominator of its two arms.
    #[must_use]
    pub fn postdominators(&self) -> Vec<BitSet> {
        let mut reversed = self.nodes.clone();
        for node in &mut reversed {
            std::mem::swap(&mut node.predecessors, &mut node.successors);
        }
        crate::graph::dominance::compute(&reversed, self.exit)
    }

    /// The set of nodes reachable from `start` by successor edges (inclusive).
    #[must_use]
    pub fn reachable_from(&self, start: NodeId) -> BitSet {
        let mut seen = BitSet::new(self.nodes.len());
        let mut worklist = vec![start];
        while let Some(node) = worklist.pop() {
            if seen.contains(node.0) {
                continue;
            }
            seen.insert(node.0);
            for &succ in &self.node(node).successors {
                if !seen.contains(succ.0) {
                    worklist.push(succ);
                }
            }
        }
        seen
    }
}
