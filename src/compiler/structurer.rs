//! Control-flow structuring: bytecode to expression tree.
//!
//! A bytecode method body is lowered in two stages. First each basic block is run
//! through an evaluation-stack simulation that turns its instructions into
//! statements and, for conditional terminators, a branch condition. Then the
//! branch graph is walked with dominance information to raise conditionals into
//! `If` nodes and natural loops into `While` nodes. Shapes the walk cannot raise
//! (switch tables, loops with impure headers, cross-loop jumps) fall back to a
//! flat label/goto rendition of the whole method, which is always correct.

use std::sync::Arc;

use crate::{
    disassembler::{BranchKind, Instruction, MethodDisassembly, Operand},
    graph::{BitSet, BranchGraph, BranchGraphBuilder, BranchNode, NodeId, NodeKind},
    ir::{BinaryOp, Constant, ExprRef, Expression, ShaderType, UnaryOp},
    module::{MethodBody, MethodDef, ShaderModule},
    Result,
};

/// How a simulated block hands control onward.
enum BlockExit {
    /// No branch instruction ended the block (merge point).
    Fallthrough,
    /// An unconditional branch.
    Jump,
    /// A conditional branch; the expression is true when the branch is taken.
    Conditional(ExprRef),
    /// A switch table; the expression is the zero-based selector.
    Switch(ExprRef),
    /// The block returned; the `Return` node is already in the statement list.
    Return,
}

struct LoopContext {
    header: NodeId,
    follow: NodeId,
}

/// Lowers one method body into an expression tree.
///
/// Tree bodies are returned as-is. Bytecode bodies are disassembled, graphed,
/// and raised into structured control flow, with a label/goto fallback for
/// shapes that cannot be raised.
///
/// # Errors
///
/// Propagates disassembly and graph construction errors, plus
/// [`crate::Error::UnresolvedToken`] for calls and field accesses naming
/// tokens the module does not know.
pub fn structure_method(module: &ShaderModule, method: &MethodDef) -> Result<ExprRef> {
    if let MethodBody::Tree(tree) = &method.body {
        return Ok(Arc::clone(tree));
    }

    let disasm = method.disassembly()?;
    let graph = BranchGraphBuilder::build(&disasm)?;
    let postdominators = graph.postdominators();

    let mut structurer = Structurer {
        module,
        method,
        disasm: &disasm,
        graph: &graph,
        postdominators,
        loops: Vec::new(),
    };

    match structurer.lower_region(graph.entry(), None) {
        Ok(statements) => Ok(Expression::Block(statements).into_ref()),
        // GraphError marks a shape the structured walk cannot raise; the flat
        // rendition handles every shape.
        Err(crate::Error::GraphError(_)) => {
            structurer.loops.clear();
            let statements = structurer.lower_fallback()?;
            Ok(Expression::Block(statements).into_ref())
        }
        Err(error) => Err(error),
    }
}

struct Structurer<'a> {
    module: &'a ShaderModule,
    method: &'a MethodDef,
    disasm: &'a MethodDisassembly,
    graph: &'a BranchGraph,
    postdominators: Vec<BitSet>,
    loops: Vec<LoopContext>,
}

impl Structurer<'_> {
    /// Walks nodes from `start` until Exit or `stop`, raising structure as it goes.
    fn lower_region(&mut self, start: NodeId, stop: Option<NodeId>) -> Result<Vec<ExprRef>> {
        let mut statements = Vec::new();
        let mut current = start;

        loop {
            if current == self.graph.exit() || Some(current) == stop {
                break;
            }

            // Jumps to the innermost loop's boundary become break/continue.
            // A jump to an outer loop's boundary has no structured equivalent.
            if let Some(context) = self.loops.last() {
                if current == context.header && stop != Some(context.header) {
                    statements.push(Expression::Continue.into_ref());
                    break;
                }
                if current == context.follow && stop != Some(context.follow) {
                    statements.push(Expression::Break.into_ref());
                    break;
                }
            }
            if self
                .loops
                .iter()
                .rev()
                .skip(1)
                .any(|c| current == c.header || current == c.follow)
            {
                return Err(crate::Error::GraphError(
                    "jump crosses a loop boundary".to_string(),
                ));
            }

            let node = self.graph.node(current).clone();
            match node.kind {
                NodeKind::Entry => {
                    current = node.successors[0];
                }
                NodeKind::Exit => break,
                NodeKind::Unit => {
                    let (stmts, exit) = self.simulate(&node)?;
                    statements.extend(stmts);
                    match exit {
                        BlockExit::Return => break,
                        BlockExit::Fallthrough | BlockExit::Jump => {
                            current = node.successors[0];
                        }
                        BlockExit::Conditional(_) | BlockExit::Switch(_) => {
                            return Err(crate::Error::GraphError(
                                "conditional exit from a unit node".to_string(),
                            ));
                        }
                    }
                }
                NodeKind::Conditional => {
                    current = self.lower_conditional(&node, &mut statements)?;
                }
                NodeKind::Loop => {
                    current = self.lower_loop(&node, &mut statements)?;
                }
            }
        }

        Ok(statements)
    }

    /// Raises a two-way conditional into an `If`, returning the join node.
    fn lower_conditional(
        &mut self,
        node: &BranchNode,
        statements: &mut Vec<ExprRef>,
    ) -> Result<NodeId> {
        let (stmts, exit) = self.simulate(node)?;
        statements.extend(stmts);

        let BlockExit::Conditional(condition) = exit else {
            return Err(crate::Error::GraphError(
                "switch has no structured form".to_string(),
            ));
        };
        let [taken, fallthrough] = node.successors[..] else {
            return Err(crate::Error::GraphError(
                "conditional without exactly two successors".to_string(),
            ));
        };

        let join = self.join_of(taken, fallthrough);
        let then_body = self.lower_region(taken, Some(join))?;
        let else_body = self.lower_region(fallthrough, Some(join))?;

        // The common `if (c) { A }` shape compiles to a branch that skips A, so
        // the taken arm is empty; invert the condition to recover the source shape.
        if then_body.is_empty() && !else_body.is_empty() {
            statements.push(
                Expression::If {
                    condition: negate(&condition),
                    then_body: Expression::Block(else_body).into_ref(),
                    else_body: None,
                }
                .into_ref(),
            );
        } else if !then_body.is_empty() {
            let else_body = if else_body.is_empty() {
                None
            } else {
                Some(Expression::Block(else_body).into_ref())
            };
            statements.push(
                Expression::If {
                    condition,
                    then_body: Expression::Block(then_body).into_ref(),
                    else_body,
                }
                .into_ref(),
            );
        }

        Ok(join)
    }

    /// Raises a natural loop into a `While`, returning the follow node.
    fn lower_loop(&mut self, node: &BranchNode, statements: &mut Vec<ExprRef>) -> Result<NodeId> {
        let (stmts, exit) = self.simulate(node)?;
        let BlockExit::Conditional(condition) = exit else {
            return Err(crate::Error::GraphError(
                "loop header without a conditional exit".to_string(),
            ));
        };
        if !stmts.is_empty() {
            // A header with its own statements would have to repeat them ahead
            // of every condition test; the flat rendition handles it instead.
            return Err(crate::Error::GraphError(
                "loop header is not a pure condition".to_string(),
            ));
        }
        let [taken, fallthrough] = node.successors[..] else {
            return Err(crate::Error::GraphError(
                "loop header without exactly two successors".to_string(),
            ));
        };

        let body_set = self.graph.natural_loop(node.id);
        let (inside, follow, condition) =
            if body_set.contains(taken.0) && !body_set.contains(fallthrough.0) {
                (taken, fallthrough, condition)
            } else if body_set.contains(fallthrough.0) && !body_set.contains(taken.0) {
                (fallthrough, taken, negate(&condition))
            } else {
                return Err(crate::Error::GraphError(
                    "loop condition does not separate body from follow".to_string(),
                ));
            };

        self.loops.push(LoopContext {
            header: node.id,
            follow,
        });
        let body = self.lower_region(inside, Some(node.id));
        self.loops.pop();

        statements.push(
            Expression::While {
                condition,
                body: Expression::Block(body?).into_ref(),
            }
            .into_ref(),
        );

        Ok(follow)
    }

    /// The join of a two-way conditional: the deepest common postdominator of
    /// both arms.
    fn join_of(&self, a: NodeId, b: NodeId) -> NodeId {
        let mut common = self.postdominators[a.0].clone();
        common.intersect_with(&self.postdominators[b.0]);

        let mut best = self.graph.exit();
        let mut best_depth = 0;
        for idx in common.iter() {
            let depth = self.postdominators[idx].count();
            if depth >= best_depth {
                best_depth = depth;
                best = NodeId(idx);
            }
        }
        best
    }

    /// Flat rendition: every block becomes a label, its statements, and explicit
    /// gotos. Always correct, used when structured raising gives up.
    fn lower_fallback(&mut self) -> Result<Vec<ExprRef>> {
        let mut blocks: Vec<&BranchNode> = self
            .graph
            .nodes()
            .iter()
            .filter(|n| !n.is_synthetic())
            .collect();
        blocks.sort_by_key(|n| n.offset);

        let mut statements = Vec::new();
        for (index, node) in blocks.iter().enumerate() {
            statements.push(Expression::Label(block_label(node.offset)).into_ref());
            let (stmts, exit) = self.simulate(node)?;
            statements.extend(stmts);

            let next_offset = blocks.get(index + 1).map(|n| n.offset);
            let terminator = self.terminator(node);
            match exit {
                BlockExit::Return => {}
                BlockExit::Jump => {
                    let target = self.expect_target(terminator)?;
                    statements.push(Expression::Goto(block_label(target)).into_ref());
                }
                BlockExit::Conditional(condition) => {
                    let terminator =
                        terminator.ok_or_else(|| malformed_error!("missing terminator"))?;
                    let target = self.expect_target(Some(terminator))?;
                    statements.push(
                        Expression::If {
                            condition,
                            then_body: Expression::Goto(block_label(target)).into_ref(),
                            else_body: None,
                        }
                        .into_ref(),
                    );
                    let fallthrough = terminator.next_offset();
                    if next_offset != Some(fallthrough) {
                        statements.push(Expression::Goto(block_label(fallthrough)).into_ref());
                    }
                }
                BlockExit::Switch(selector) => {
                    let terminator =
                        terminator.ok_or_else(|| malformed_error!("missing terminator"))?;
                    let targets = terminator.switch_targets().unwrap_or(&[]).to_vec();
                    for (case, target) in targets.iter().enumerate() {
                        statements.push(
                            Expression::If {
                                condition: Expression::Binary {
                                    op: BinaryOp::Eq,
                                    left: Arc::clone(&selector),
                                    right: Expression::Constant(Constant::Int32(case as i32))
                                        .into_ref(),
                                }
                                .into_ref(),
                                then_body: Expression::Goto(block_label(*target)).into_ref(),
                                else_body: None,
                            }
                            .into_ref(),
                        );
                    }
                    let fallthrough = terminator.next_offset();
                    if next_offset != Some(fallthrough) {
                        statements.push(Expression::Goto(block_label(fallthrough)).into_ref());
                    }
                }
                BlockExit::Fallthrough => {
                    let fallthrough = self.graph.node(node.successors[0]).offset;
                    if next_offset != Some(fallthrough) {
                        statements.push(Expression::Goto(block_label(fallthrough)).into_ref());
                    }
                }
            }
        }

        Ok(statements)
    }

    fn terminator(&self, node: &BranchNode) -> Option<&Instruction> {
        node.instructions
            .end
            .checked_sub(1)
            .and_then(|i| self.disasm.instructions().get(i))
    }

    fn expect_target(&self, terminator: Option<&Instruction>) -> Result<u32> {
        terminator
            .and_then(Instruction::branch_target)
            .ok_or_else(|| malformed_error!("branch instruction without a target"))
    }

    /// Evaluation-stack simulation of one block's instructions.
    fn simulate(&self, node: &BranchNode) -> Result<(Vec<ExprRef>, BlockExit)> {
        let mut stack: Vec<ExprRef> = Vec::new();
        let mut statements: Vec<ExprRef> = Vec::new();
        let mut exit = BlockExit::Fallthrough;

        for instruction in &self.disasm.instructions()[node.instructions.clone()] {
            if matches!(
                instruction.branch,
                BranchKind::UnconditionalBranch | BranchKind::ConditionalBranch
            ) {
                exit = self.simulate_branch(instruction, &mut stack)?;
                break;
            }

            match instruction.opcode {
                0x00 => {} // nop

                // Arguments
                0x02..=0x05 => stack.push(self.argument(instruction.opcode as u16 - 0x02)?),
                0x0E => {
                    let Operand::UInt(n) = instruction.operand else {
                        return Err(malformed_error!("ldarg.s without an index"));
                    };
                    stack.push(self.argument(n as u16)?);
                }
                0xFE09 => {
                    let Operand::UInt(n) = instruction.operand else {
                        return Err(malformed_error!("ldarg without an index"));
                    };
                    stack.push(self.argument(n as u16)?);
                }
                0x10 => {
                    // starg.s
                    let Operand::UInt(n) = instruction.operand else {
                        return Err(malformed_error!("starg.s without an index"));
                    };
                    let value = pop(&mut stack)?;
                    statements.push(
                        Expression::Assign {
                            target: self.argument(n as u16)?,
                            value,
                        }
                        .into_ref(),
                    );
                }

                // Locals
                0x06..=0x09 => stack.push(self.local(instruction.opcode as u16 - 0x06)?),
                0x0A..=0x0D => {
                    let value = pop(&mut stack)?;
                    statements.push(
                        Expression::Assign {
                            target: self.local(instruction.opcode as u16 - 0x0A)?,
                            value,
                        }
                        .into_ref(),
                    );
                }
                0x11 | 0xFE0C => {
                    let Operand::UInt(slot) = instruction.operand else {
                        return Err(malformed_error!("ldloc without a slot"));
                    };
                    stack.push(self.local(slot as u16)?);
                }
                0x12 | 0xFE0D => {
                    // ldloca: the local itself stands in as the lvalue.
                    let Operand::UInt(slot) = instruction.operand else {
                        return Err(malformed_error!("ldloca without a slot"));
                    };
                    stack.push(self.local(slot as u16)?);
                }
                0x13 | 0xFE0E => {
                    let Operand::UInt(slot) = instruction.operand else {
                        return Err(malformed_error!("stloc without a slot"));
                    };
                    let value = pop(&mut stack)?;
                    statements.push(
                        Expression::Assign {
                            target: self.local(slot as u16)?,
                            value,
                        }
                        .into_ref(),
                    );
                }

                // Constants
                0x15..=0x1E => {
                    let value = instruction.opcode as i32 - 0x16;
                    stack.push(Expression::Constant(Constant::Int32(value)).into_ref());
                }
                0x1F | 0x20 => {
                    let Operand::Int(value) = instruction.operand else {
                        return Err(malformed_error!("ldc.i4 without a value"));
                    };
                    stack.push(Expression::Constant(Constant::Int32(value as i32)).into_ref());
                }
                0x22 => {
                    let Operand::Float32(value) = instruction.operand else {
                        return Err(malformed_error!("ldc.r4 without a value"));
                    };
                    stack.push(Expression::Constant(Constant::Float32(value)).into_ref());
                }
                0x23 => {
                    // Doubles narrow to the shader's float width.
                    let Operand::Float64(value) = instruction.operand else {
                        return Err(malformed_error!("ldc.r8 without a value"));
                    };
                    stack
                        .push(Expression::Constant(Constant::Float32(value as f32)).into_ref());
                }
                0x14 => {
                    return Err(crate::Error::ReferenceType("ldnull".to_string()));
                }

                // Stack shuffles
                0x25 => {
                    let top = stack
                        .last()
                        .cloned()
                        .ok_or_else(|| malformed_error!("dup on an empty stack"))?;
                    stack.push(top);
                }
                0x26 => {
                    let value = pop(&mut stack)?;
                    // A discarded call still executes.
                    if matches!(
                        value.as_ref(),
                        Expression::Call { .. }
                            | Expression::CompiledCall { .. }
                            | Expression::IntrinsicCall { .. }
                    ) {
                        statements.push(value);
                    }
                }

                // Arithmetic and bitwise
                0x58 => binary(&mut stack, BinaryOp::Add)?,
                0x59 => binary(&mut stack, BinaryOp::Sub)?,
                0x5A => binary(&mut stack, BinaryOp::Mul)?,
                0x5B | 0x5C => binary(&mut stack, BinaryOp::Div)?,
                0x5D | 0x5E => binary(&mut stack, BinaryOp::Rem)?,
                0x5F => binary(&mut stack, BinaryOp::And)?,
                0x60 => binary(&mut stack, BinaryOp::Or)?,
                0x61 => binary(&mut stack, BinaryOp::Xor)?,
                0x62 => binary(&mut stack, BinaryOp::Shl)?,
                0x63 | 0x64 => binary(&mut stack, BinaryOp::Shr)?,
                0x65 => unary(&mut stack, UnaryOp::Neg)?,
                0x66 => unary(&mut stack, UnaryOp::Not)?,

                // Comparisons
                0xFE01 => binary(&mut stack, BinaryOp::Eq)?,
                0xFE02 | 0xFE03 => binary(&mut stack, BinaryOp::Gt)?,
                0xFE04 | 0xFE05 => binary(&mut stack, BinaryOp::Lt)?,

                // Conversions keep the value; the shader type model has a
                // single float width and the backends do not need casts here.
                0x67..=0x6E | 0x76 | 0xD1..=0xD4 => {}

                // Fields
                0x7B | 0x7C => {
                    let Operand::Token(token) = instruction.operand else {
                        return Err(malformed_error!("ldfld without a token"));
                    };
                    let field = self.module.field_ref(token)?.clone();
                    let object = pop(&mut stack)?;
                    stack.push(Expression::MemberAccess { object, field }.into_ref());
                }
                0x7D => {
                    let Operand::Token(token) = instruction.operand else {
                        return Err(malformed_error!("stfld without a token"));
                    };
                    let field = self.module.field_ref(token)?.clone();
                    let value = pop(&mut stack)?;
                    let object = pop(&mut stack)?;
                    statements.push(
                        Expression::Assign {
                            target: Expression::MemberAccess { object, field }.into_ref(),
                            value,
                        }
                        .into_ref(),
                    );
                }

                // Calls
                0x28 | 0x6F => {
                    self.simulate_call(instruction, &mut stack, &mut statements)?;
                }
                0x73 => {
                    let Operand::Token(token) = instruction.operand else {
                        return Err(malformed_error!("newobj without a token"));
                    };
                    let ctor = self.module.method(token)?;
                    let arguments = pop_n(&mut stack, ctor.signature.parameters.len())?;
                    stack.push(Expression::Construct { token, arguments }.into_ref());
                }
                0xFE15 => {
                    let Operand::Token(token) = instruction.operand else {
                        return Err(malformed_error!("initobj without a token"));
                    };
                    let target = pop(&mut stack)?;
                    statements.push(
                        Expression::Assign {
                            target,
                            value: Expression::Construct {
                                token,
                                arguments: Vec::new(),
                            }
                            .into_ref(),
                        }
                        .into_ref(),
                    );
                }

                // Return
                0x2A => {
                    let value = if self.method.signature.return_type == ShaderType::Void {
                        None
                    } else {
                        Some(pop(&mut stack)?)
                    };
                    statements.push(Expression::Return(value).into_ref());
                    exit = BlockExit::Return;
                }

                other => {
                    return Err(crate::Error::UnsupportedConstruct(
                        crate::module::Token::new(u32::from(other)),
                    ));
                }
            }
        }

        if !stack.is_empty() {
            return Err(malformed_error!(
                "Evaluation stack holds {} value(s) at a block boundary (offset 0x{:x})",
                stack.len(),
                node.offset
            ));
        }

        Ok((statements, exit))
    }

    /// Builds the exit for a branch terminator, consuming its stack operands.
    fn simulate_branch(
        &self,
        instruction: &Instruction,
        stack: &mut Vec<ExprRef>,
    ) -> Result<BlockExit> {
        let comparison = |stack: &mut Vec<ExprRef>, op: BinaryOp| -> Result<BlockExit> {
            let right = pop(stack)?;
            let left = pop(stack)?;
            Ok(BlockExit::Conditional(
                Expression::Binary { op, left, right }.into_ref(),
            ))
        };

        match instruction.opcode {
            // br, br.s, leave, leave.s
            0x2B | 0x38 | 0xDD | 0xDE => Ok(BlockExit::Jump),
            // brfalse: taken when the condition is false
            0x2C | 0x39 => Ok(BlockExit::Conditional(negate(&pop(stack)?))),
            // brtrue
            0x2D | 0x3A => Ok(BlockExit::Conditional(pop(stack)?)),
            0x2E | 0x3B => comparison(stack, BinaryOp::Eq),
            0x2F | 0x3C | 0x34 | 0x41 => comparison(stack, BinaryOp::Ge),
            0x30 | 0x3D | 0x35 | 0x42 => comparison(stack, BinaryOp::Gt),
            0x31 | 0x3E | 0x36 | 0x43 => comparison(stack, BinaryOp::Le),
            0x32 | 0x3F | 0x37 | 0x44 => comparison(stack, BinaryOp::Lt),
            0x33 | 0x40 => comparison(stack, BinaryOp::Ne),
            0x45 => Ok(BlockExit::Switch(pop(stack)?)),
            other => Err(crate::Error::UnsupportedConstruct(
                crate::module::Token::new(u32::from(other)),
            )),
        }
    }

    /// Simulates `call`/`callvirt`: intrinsic mapping first, then module lookup.
    fn simulate_call(
        &self,
        instruction: &Instruction,
        stack: &mut Vec<ExprRef>,
        statements: &mut Vec<ExprRef>,
    ) -> Result<()> {
        let Operand::Token(token) = instruction.operand else {
            return Err(malformed_error!("call without a token"));
        };

        if let Some(op) = self.module.intrinsic(token) {
            let arguments = pop_n(stack, op.arity())?;
            stack.push(Expression::IntrinsicCall { op, arguments }.into_ref());
            return Ok(());
        }

        let callee = self.module.method(token)?;
        let arguments = pop_n(stack, callee.signature.parameters.len())?;
        let receiver = if callee.signature.is_static {
            None
        } else {
            Some(pop(stack)?)
        };

        let call = Expression::Call {
            token,
            receiver,
            arguments,
        }
        .into_ref();

        if callee.signature.return_type == ShaderType::Void {
            statements.push(call);
        } else {
            stack.push(call);
        }
        Ok(())
    }

    /// Argument `n` counting the instance receiver as slot zero.
    fn argument(&self, n: u16) -> Result<ExprRef> {
        if !self.method.signature.is_static {
            if n == 0 {
                return Ok(Expression::SelfReference.into_ref());
            }
            return self.parameter(n - 1);
        }
        self.parameter(n)
    }

    fn parameter(&self, index: u16) -> Result<ExprRef> {
        let param = self
            .method
            .signature
            .parameters
            .get(usize::from(index))
            .ok_or_else(|| {
                malformed_error!(
                    "Method {} has no parameter {index}",
                    self.method.token
                )
            })?;
        Ok(Expression::MethodParameter {
            index,
            name: param.name.clone(),
            ty: param.ty.clone(),
        }
        .into_ref())
    }

    fn local(&self, slot: u16) -> Result<ExprRef> {
        let ty = self
            .method
            .locals
            .get(usize::from(slot))
            .ok_or_else(|| {
                malformed_error!("Method {} has no local slot {slot}", self.method.token)
            })?
            .clone();
        Ok(Expression::LocalVariable { slot, ty }.into_ref())
    }
}

fn pop(stack: &mut Vec<ExprRef>) -> Result<ExprRef> {
    stack
        .pop()
        .ok_or_else(|| malformed_error!("Evaluation stack underflow"))
}

/// Pops `count` values pushed left-to-right, restoring source order.
fn pop_n(stack: &mut Vec<ExprRef>, count: usize) -> Result<Vec<ExprRef>> {
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(pop(stack)?);
    }
    values.reverse();
    Ok(values)
}

fn binary(stack: &mut Vec<ExprRef>, op: BinaryOp) -> Result<()> {
    let right = pop(stack)?;
    let left = pop(stack)?;
    stack.push(Expression::Binary { op, left, right }.into_ref());
    Ok(())
}

fn unary(stack: &mut Vec<ExprRef>, op: UnaryOp) -> Result<()> {
    let operand = pop(stack)?;
    stack.push(Expression::Unary { op, operand }.into_ref());
    Ok(())
}

/// Logical negation, folding double negation and comparison inversion.
fn negate(condition: &ExprRef) -> ExprRef {
    match condition.as_ref() {
        Expression::Binary { op, left, right } => {
            if let Some(inverted) = op.negated() {
                return Expression::Binary {
                    op: inverted,
                    left: Arc::clone(left),
                    right: Arc::clone(right),
                }
                .into_ref();
            }
            Expression::Unary {
                op: UnaryOp::Not,
                operand: Arc::clone(condition),
            }
            .into_ref()
        }
        Expression::Unary {
            op: UnaryOp::Not,
            operand,
        } => Arc::clone(operand),
        _ => Expression::Unary {
            op: UnaryOp::Not,
            operand: Arc::clone(condition),
        }
        .into_ref(),
    }
}

fn block_label(offset: u32) -> String {
    format!("IL_{offset:04x}")
}
