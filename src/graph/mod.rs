//! Branch graph analysis over disassembled method bodies.
//!
//! Recovers a control-flow graph ([`BranchGraph`]) from a [`crate::disassembler::MethodDisassembly`],
//! including retroactive block splitting for targets discovered after a block was
//! built, synthetic Entry/Exit nodes, and eagerly computed dominator sets. The
//! structurer consumes this graph to raise conditionals and loops back into
//! structured expressions.
//!
//! # Key Types
//! - [`BranchGraph`] - The per-method control-flow graph with dominance
//! - [`BranchGraphBuilder`] - Single-entry construction from a disassembly
//! - [`BranchNode`] / [`NodeKind`] - Blocks and their classification
//! - [`BitSet`] - Compact node sets used by the dominance fixed point

mod bitset;
mod builder;
mod dominance;
mod node;

pub use bitset::BitSet;
pub use builder::BranchGraphBuilder;
pub use node::{BranchGraph, BranchNode, NodeId, NodeKind};
