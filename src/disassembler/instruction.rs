//! Decoded CIL instruction representation.
//!
//! A decoded [`Instruction`] is immutable once produced: it carries its byte offset and
//! size, the decoded [`Operand`], a fixed [`BranchKind`] classification looked up from the
//! static opcode table, and an optional prefix chain linking modifier opcodes to the real
//! instruction they annotate.

use strum::{Display, EnumIter};

use crate::module::Token;

/// Shape of an instruction's operand bytes, looked up from the static opcode table.
///
/// Every opcode has exactly one operand shape; the decoder reads precisely that many
/// bytes after the opcode header, and the instruction size is header plus operand bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// No operand bytes.
    None,
    /// A signed 8-bit immediate.
    Int8,
    /// An unsigned 8-bit immediate.
    UInt8,
    /// An unsigned 16-bit immediate (wide local/argument index).
    UInt16,
    /// A signed 32-bit immediate.
    Int32,
    /// A signed 64-bit immediate.
    Int64,
    /// A 32-bit float immediate.
    Float32,
    /// A 64-bit float immediate.
    Float64,
    /// A metadata token referencing a method, field, type, or string.
    Token,
    /// A narrow (8-bit) branch offset, relative to the next instruction.
    BranchTarget8,
    /// A wide (32-bit) branch offset, relative to the next instruction.
    BranchTarget32,
    /// A case count followed by that many 32-bit relative targets.
    Switch,
}

/// Fixed branch classification of an opcode.
///
/// Every supported opcode has exactly one classification, and
/// [`Instruction::branch_target`] is non-null iff the classification is
/// [`BranchKind::UnconditionalBranch`] or [`BranchKind::ConditionalBranch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum BranchKind {
    /// Control falls through to the next instruction.
    NoBranch,
    /// Control always transfers to the branch target.
    UnconditionalBranch,
    /// Control transfers to the target or falls through. `switch` is classified
    /// here: multiple case targets plus fallthrough.
    ConditionalBranch,
    /// Control leaves the method (return, throw).
    Terminates,
}

/// A decoded operand.
///
/// Branch offsets are resolved to absolute byte offsets within the method body
/// at decode time, so consumers never deal with relative displacements.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand.
    None,
    /// A signed integer immediate (any width, sign-extended).
    Int(i64),
    /// An unsigned integer immediate.
    UInt(u64),
    /// A 32-bit float immediate.
    Float32(f32),
    /// A 64-bit float immediate.
    Float64(f64),
    /// A metadata token.
    Token(Token),
    /// An absolute branch target offset.
    Target(u32),
    /// A switch table of absolute target offsets.
    Switch(Vec<u32>),
}

/// A single decoded CIL instruction. Immutable once decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Byte offset of the first header byte within the method body.
    pub offset: u32,
    /// Total size in bytes: header plus operand bytes, including any prefix bytes
    /// folded into this logical instruction.
    pub size: u32,
    /// Full opcode; two-byte encodings carry 0xFE in the high byte.
    pub opcode: u16,
    /// Static mnemonic from the opcode table.
    pub mnemonic: &'static str,
    /// Fixed branch classification from the opcode table.
    pub branch: BranchKind,
    /// Decoded operand.
    pub operand: Operand,
    /// Opcodes of preceding prefix instructions (`volatile.`, `unaligned.`, ...)
    /// attached to this logical instruction, in encounter order.
    pub prefixes: Vec<u16>,
}

impl Instruction {
    /// Byte offset of the instruction following this one.
    #[must_use]
    pub fn next_offset(&self) -> u32 {
        self.offset + self.size
    }

    /// The branch target, derived from the classification.
    ///
    /// Non-null iff the classification is [`BranchKind::UnconditionalBranch`] or
    /// [`BranchKind::ConditionalBranch`]. For `switch` this is the first case
    /// target; the full table is available via [`switch_targets`](Self::switch_targets).
    #[must_use]
    pub fn branch_target(&self) -> Option<u32> {
        match self.branch {
            BranchKind::UnconditionalBranch | BranchKind::ConditionalBranch => {
                match &self.operand {
                    Operand::Target(target) => Some(*target),
                    Operand::Switch(targets) => targets.first().copied(),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// The full switch table, or `None` for non-switch instructions.
    #[must_use]
    pub fn switch_targets(&self) -> Option<&[u32]> {
        match &self.operand {
            Operand::Switch(targets) => Some(targets),
            _ => None,
        }
    }

    /// All possible transfer targets of this instruction, excluding fallthrough.
    #[must_use]
    pub fn all_targets(&self) -> Vec<u32> {
        match &self.operand {
            Operand::Target(target) => vec![*target],
            Operand::Switch(targets) => targets.clone(),
            _ => Vec::new(),
        }
    }
}
