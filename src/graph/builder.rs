//! Branch graph construction.
//!
//! The builder grows blocks from the method entry: a block is extended until either the
//! next instruction is a known target of some already-visited branch (merge point), the
//! current instruction branches, or the current instruction terminates. Blocks are
//! memoized by their first instruction's offset so a later-discovered target reuses
//! rather than duplicates a block, and a branch found to target the interior of an
//! already-built block retroactively splits that block. Single-pass construction
//! without the splitting step is incorrect and is not used here.

use std::collections::HashMap;

use crate::{
    disassembler::{BranchKind, MethodDisassembly},
    graph::{
        dominance,
        node::{BranchGraph, BranchNode, NodeId, NodeKind},
    },
    Result,
};

/// Stateful builder producing one [`BranchGraph`] per method disassembly.
pub struct BranchGraphBuilder<'a> {
    disasm: &'a MethodDisassembly,
    nodes: Vec<BranchNode>,
    entry: NodeId,
    exit: NodeId,
    /// Start offset of every materialized block.
    block_at: HashMap<u32, NodeId>,
    /// Blocks created but not yet grown.
    worklist: Vec<NodeId>,
}

impl<'a> BranchGraphBuilder<'a> {
    /// Builds the branch graph for a method disassembly.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] when control can fall off the end of
    /// the method body, and [`crate::Error::InvalidBranchTarget`] for targets
    /// that do not land on an instruction boundary.
    pub fn build(disasm: &'a MethodDisassembly) -> Result<BranchGraph> {
        let mut builder = BranchGraphBuilder {
            disasm,
            nodes: vec![
                BranchNode::new(NodeId(0), NodeKind::Entry, 0),
                BranchNode::new(NodeId(1), NodeKind::Exit, 0),
            ],
            entry: NodeId(0),
            exit: NodeId(1),
            block_at: HashMap::new(),
            worklist: Vec::new(),
        };

        if disasm.is_empty() {
            builder.add_edge(builder.entry, builder.exit);
        } else {
            let first = builder.ensure_block(0)?;
            builder.add_edge(builder.entry, first);

            while let Some(node) = builder.worklist.pop() {
                builder.grow_block(node)?;
            }
        }

        let dominators = dominance::compute(&builder.nodes, builder.entry);
        let mut graph = BranchGraph {
            nodes: builder.nodes,
            entry: builder.entry,
            exit: builder.exit,
            dominators,
        };
        classify(&mut graph);

        Ok(graph)
    }

    /// Appends instructions to `id` until a merge point, branch, or terminator.
    fn grow_block(&mut self, id: NodeId) -> Result<()> {
        let offset = self.nodes[id.0].offset;
        let start_index = self
            .disasm
            .index_at(offset)
            .ok_or(crate::Error::InvalidBranchTarget(offset))?;

        let mut index = start_index;
        loop {
            let Some(instruction) = self.disasm.instructions().get(index) else {
                return Err(malformed_error!(
                    "Control falls off the end of the method body at index {}",
                    index
                ));
            };

            // A known target of an already-visited branch starts its own block;
            // link to it instead of continuing.
            if index > start_index && self.block_at.contains_key(&instruction.offset) {
                self.nodes[id.0].instructions = start_index..index;
                let merge = self.block_at[&instruction.offset];
                self.add_edge(id, merge);
                return Ok(());
            }

            match instruction.branch {
                BranchKind::NoBranch => {
                    index += 1;
                }
                BranchKind::UnconditionalBranch => {
                    self.nodes[id.0].instructions = start_index..index + 1;
                    let targets = instruction.all_targets();
                    for target in targets {
                        let node = self.ensure_block(target)?;
                        self.add_edge(id, node);
                    }
                    return Ok(());
                }
                BranchKind::ConditionalBranch => {
                    let fallthrough = instruction.next_offset();
                    self.nodes[id.0].instructions = start_index..index + 1;

                    for target in instruction.all_targets() {
                        let node = self.ensure_block(target)?;
                        self.add_edge(id, node);
                    }

                    // Fallthrough successor is always last.
                    let node = self.ensure_block(fallthrough)?;
                    self.add_edge(id, node);
                    return Ok(());
                }
                BranchKind::Terminates => {
                    self.nodes[id.0].instructions = start_index..index + 1;
                    let exit = self.exit;
                    self.add_edge(id, exit);
                    return Ok(());
                }
            }
        }
    }

    /// Returns the block starting at `offset`, creating or splitting as needed.
    fn ensure_block(&mut self, offset: u32) -> Result<NodeId> {
        if let Some(&node) = self.block_at.get(&offset) {
            return Ok(node);
        }

        let split_index = self
            .disasm
            .index_at(offset)
            .ok_or(crate::Error::InvalidBranchTarget(offset))?;

        // A target landing in the interior of an already-grown block splits it.
        let covering = self.nodes.iter().find(|node| {
            !node.is_synthetic()
                && node.instructions.start < split_index
                && split_index < node.instructions.end
        });
        if let Some(covering) = covering {
            return Ok(self.split_block(covering.id, split_index, offset));
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(BranchNode::new(id, NodeKind::Unit, offset));
        self.block_at.insert(offset, id);
        self.worklist.push(id);
        Ok(id)
    }

    /// Splits `id` at `split_index`, keeping the head in place and moving the
    /// tail (including the terminator and all successor edges) to a new node.
    fn split_block(&mut self, id: NodeId, split_index: usize, offset: u32) -> NodeId {
        let tail_id = NodeId(self.nodes.len());
        let mut tail = BranchNode::new(tail_id, NodeKind::Unit, offset);

        tail.instructions = split_index..self.nodes[id.0].instructions.end;
        tail.successors = std::mem::take(&mut self.nodes[id.0].successors);
        for &succ in &tail.successors {
            for pred in &mut self.nodes[succ.0].predecessors {
                if *pred == id {
                    *pred = tail_id;
                }
            }
        }

        self.nodes[id.0].instructions.end = split_index;
        self.nodes.push(tail);
        self.block_at.insert(offset, tail_id);
        self.add_edge(id, tail_id);
        tail_id
    }

    /// Adds a successor edge and its inverse predecessor edge.
    fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.nodes[from.0].successors.push(to);
        self.nodes[to.0].predecessors.push(from);
    }
}

/// Assigns final node kinds once dominance is known: conditional terminators make
/// a node Conditional, and a node that dominates one of its own predecessors is a
/// Loop header regardless of terminator shape.
fn classify(graph: &mut BranchGraph) {
    for idx in 0..graph.nodes.len() {
        let id = NodeId(idx);
        if graph.nodes[idx].is_synthetic() {
            continue;
        }

        let conditional = graph.nodes[idx].successors.len() > 1;
        let is_header = graph.nodes[idx]
            .predecessors
            .iter()
            .any(|&p| graph.dominates(id, p));

        graph.nodes[idx].kind = if is_header {
            NodeKind::Loop
        } else if conditional {
            NodeKind::Conditional
        } else {
            NodeKind::Unit
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{disassembler::MethodDisassembly, graph::NodeKind};

    fn graph_of(code: &[u8]) -> BranchGraph {
        let disasm = MethodDisassembly::from_bytecode(code).unwrap();
        BranchGraphBuilder::build(&disasm).unwrap()
    }

    #[test]
    fn linear_code_single_block() {
        let graph = graph_of(&[0x00, 0x16, 0x0A, 0x2A]); // nop, ldc.i4.0, stloc.0, ret

        assert_eq!(graph.len(), 3); // entry, exit, one unit
        let block = graph.node(graph.node(graph.entry()).successors[0]);
        assert_eq!(block.kind, NodeKind::Unit);
        assert_eq!(block.instructions, 0..4);
        assert_eq!(block.successors, vec![graph.exit()]);
    }

    #[test]
    fn conditional_produces_diamond() {
        let code = [
            0x16, // ldc.i4.0
            0x2C, 0x01, // brfalse.s +1 -> offset 4
            0x00, // nop (fallthrough arm)
            0x2A, // ret  <- also branch target
        ];
        let graph = graph_of(&code);

        let head = graph.node(graph.node(graph.entry()).successors[0]);
        assert_eq!(head.kind, NodeKind::Conditional);
        assert_eq!(head.successors.len(), 2);

        // Both arms eventually reach exit, and entry dominates everything.
        for node in graph.nodes() {
            assert!(graph.dominates(graph.entry(), node.id));
            assert!(graph.dominates(node.id, node.id));
        }
    }

    #[test]
    fn terminators_link_to_single_exit() {
        let code = [
            0x16, // ldc.i4.0
            0x2C, 0x01, // brfalse.s +1 -> offset 4
            0x2A, // ret
            0x2A, // ret
        ];
        let graph = graph_of(&code);

        let exit = graph.node(graph.exit());
        assert_eq!(exit.predecessors.len(), 2);
        assert!(exit.successors.is_empty());
    }

    #[test]
    fn while_loop_header_classified() {
        let code = [
            0x00, // 0: nop
            0x16, // 1: ldc.i4.0
            0x0A, // 2: stloc.0
            0x2B, 0x05, // 3: br.s +5 -> 10 (condition)
            0x06, // 5: ldloc.0 (body)
            0x17, // 6: ldc.i4.1
            0x58, // 7: add
            0x0A, // 8: stloc.0
            0x00, // 9: nop
            0x06, // 10: ldloc.0 (condition)
            0x1E, // 11: ldc.i4.8
            0x32, 0xF7, // 12: blt.s -9 -> 5 (back to body)
            0x2A, // 14: ret
        ];
        let graph = graph_of(&code);

        let header = graph
            .nodes()
            .iter()
            .find(|n| n.kind == NodeKind::Loop)
            .expect("loop header");
        assert_eq!(header.offset, 10);

        // The header dominates its whole natural loop and is dominated only by
        // entry, the preheader chain, and itself.
        let body = graph.natural_loop(header.id);
        for idx in body.iter() {
            assert!(graph.dominates(header.id, NodeId(idx)));
        }
        assert!(graph
            .back_edge_sources(header.id)
            .iter()
            .all(|&p| body.contains(p.0)));
    }

    #[test]
    fn interior_target_splits_block() {
        let code = [
            0x16, // 0: ldc.i4.0
            0x2C, 0x03, // 1: brfalse.s +3 -> 6
            0x00, // 3: nop
            0x00, // 4: nop       <- later discovered target
            0x2A, // 5: ret
            0x2B, 0xFC, // 6: br.s -4 -> 4 (interior of the 3..5 block)
        ];
        let graph = graph_of(&code);

        // The block starting at 3 must have been split at 4.
        let head = graph.nodes().iter().find(|n| n.offset == 3 && !n.is_synthetic());
        let tail = graph.nodes().iter().find(|n| n.offset == 4 && !n.is_synthetic());
        let (head, tail) = (head.expect("head"), tail.expect("tail"));

        assert_eq!(head.successors, vec![tail.id]);
        assert!(tail.predecessors.contains(&head.id));
        // The tail kept the terminator and the exit edge.
        assert_eq!(tail.successors, vec![graph.exit()]);
    }

    #[test]
    fn merge_point_reuses_block() {
        let code = [
            0x16, // 0: ldc.i4.0
            0x2C, 0x01, // 1: brfalse.s +1 -> 4
            0x00, // 3: nop
            0x00, // 4: nop  <- merge point
            0x2A, // 5: ret
        ];
        let graph = graph_of(&code);

        let merge = graph
            .nodes()
            .iter()
            .find(|n| n.offset == 4 && !n.is_synthetic())
            .expect("merge block");
        assert_eq!(merge.predecessors.len(), 2);
    }

    #[test]
    fn empty_body_connects_entry_to_exit() {
        let disasm = MethodDisassembly::from_bytecode(&[]).unwrap();
        let graph = BranchGraphBuilder::build(&disasm).unwrap();
        assert_eq!(graph.node(graph.entry()).successors, vec![graph.exit()]);
    }
}
