//! CIL bytecode disassembler for shader method bodies.
//!
//! This module decodes a method's raw bytecode into a typed instruction sequence, the
//! first stage of the bytecode fallback path (bodies that cannot be captured directly as
//! an expression tree). It includes table-driven instruction decoding, prefix-chain
//! handling, and the per-method [`MethodDisassembly`] artifact with offset-resolved
//! branch targets.
//!
//! # Key Types
//! - [`Instruction`] - A decoded CIL instruction
//! - [`MethodDisassembly`] - One method's instruction sequence plus offset lookup
//! - [`Operand`] - Instruction operands (immediates, tokens, targets)
//! - [`BranchKind`] - Fixed branch classification per opcode
//!
//! # Example
//! ```rust
//! use cilshader::disassembler::MethodDisassembly;
//! let bytecode = [0x00, 0x2A]; // nop, ret
//! let disasm = MethodDisassembly::from_bytecode(&bytecode)?;
//! assert_eq!(disasm.len(), 2);
//! # Ok::<(), cilshader::Error>(())
//! ```

mod decoder;
mod instruction;
mod opcodes;
mod parser;

pub use decoder::{decode_instruction, decode_stream, MethodDisassembly};
pub use instruction::{BranchKind, Instruction, Operand, OperandKind};
pub use opcodes::{opcode_info, OpcodeInfo, OPCODES, OPCODES_FE};
pub use parser::Parser;
