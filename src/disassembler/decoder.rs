//! CIL instruction decoding.
//!
//! This module turns a method's raw bytecode into a typed [`Instruction`] sequence.
//! Decoding is table-driven: the opcode header (one byte, or two via the 0xFE escape)
//! selects an [`OpcodeInfo`](crate::disassembler::OpcodeInfo) entry whose operand shape
//! says exactly how many operand bytes follow. Prefix opcodes do not end a logical
//! instruction; they fold into the following real instruction as a prefix chain.
//!
//! # Example: Decoding a Single Instruction
//!
//! ```rust
//! use cilshader::disassembler::{decode_instruction, Parser};
//! let code = [0x2A]; // ret
//! let mut parser = Parser::new(&code);
//! let instr = decode_instruction(&mut parser)?;
//! assert_eq!(instr.mnemonic, "ret");
//! # Ok::<(), cilshader::Error>(())
//! ```

use std::collections::HashMap;

use crate::{
    disassembler::{
        instruction::{BranchKind, Instruction, Operand, OperandKind},
        opcodes::{OPCODES, OPCODES_FE},
        parser::Parser,
    },
    Result,
};

/// One method's full decoded instruction sequence plus an offset lookup.
///
/// The offset map is required to resolve branch targets: a branch operand is an
/// absolute byte offset, and a target that does not land on an instruction
/// boundary is a structural corruption error. Created once per method and
/// memoized for the compile's lifetime.
#[derive(Debug)]
pub struct MethodDisassembly {
    /// Ordered decoded instructions.
    instructions: Vec<Instruction>,
    /// Byte offset of each instruction's first header byte to its index.
    offsets: HashMap<u32, usize>,
}

impl MethodDisassembly {
    /// Disassembles a complete method body.
    ///
    /// Every instruction is decoded in linear order, then every branch target is
    /// checked against the instruction boundaries.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::InvalidOpcode`] for unknown or reserved encodings
    /// - [`crate::Error::OutOfBounds`] for an operand truncated by the buffer end
    /// - [`crate::Error::InvalidBranchTarget`] for a target off instruction boundaries
    pub fn from_bytecode(bytecode: &[u8]) -> Result<Self> {
        let mut parser = Parser::new(bytecode);
        let instructions = decode_stream(&mut parser)?;

        let mut offsets = HashMap::with_capacity(instructions.len());
        for (index, instruction) in instructions.iter().enumerate() {
            offsets.insert(instruction.offset, index);
        }

        for instruction in &instructions {
            for target in instruction.all_targets() {
                if !offsets.contains_key(&target) {
                    return Err(crate::Error::InvalidBranchTarget(target));
                }
            }
        }

        Ok(MethodDisassembly {
            instructions,
            offsets,
        })
    }

    /// The decoded instructions in byte order.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// The instruction starting at `offset`, if any starts exactly there.
    #[must_use]
    pub fn instruction_at(&self, offset: u32) -> Option<&Instruction> {
        self.offsets.get(&offset).map(|&i| &self.instructions[i])
    }

    /// Index of the instruction starting at `offset`.
    #[must_use]
    pub fn index_at(&self, offset: u32) -> Option<usize> {
        self.offsets.get(&offset).copied()
    }

    /// Number of decoded instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the method body decoded to zero instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Decodes a continuous stream of CIL instructions until the parser is exhausted.
///
/// # Errors
///
/// Returns an error if the stream contains an invalid opcode or an operand is
/// truncated by the end of the buffer.
pub fn decode_stream(parser: &mut Parser) -> Result<Vec<Instruction>> {
    let mut instructions = Vec::new();

    while parser.has_more_data() {
        instructions.push(decode_instruction(parser)?);
    }

    Ok(instructions)
}

/// Decodes a single logical CIL instruction from the current parser position.
///
/// Prefix opcodes (`volatile.`, `unaligned.`, `constrained.`, `readonly.`, `no.`,
/// `tail.`) are consumed together with the real instruction they modify; the
/// returned [`Instruction`] spans all of them and records their opcodes in its
/// prefix chain.
///
/// # Errors
///
/// - [`crate::Error::InvalidOpcode`] for unknown or reserved encodings
/// - [`crate::Error::OutOfBounds`] if an operand cannot be fully read
pub fn decode_instruction(parser: &mut Parser) -> Result<Instruction> {
    let start = parser.pos() as u32;
    let mut prefixes = Vec::new();

    loop {
        let first_byte = parser.read_le::<u8>()?;

        let (info, opcode) = match first_byte {
            0xFE => {
                let second_byte = parser.read_le::<u8>()?;
                let opcode = 0xFE00 | u16::from(second_byte);
                match OPCODES_FE.get(second_byte as usize) {
                    Some(info) => (info, opcode),
                    None => return Err(crate::Error::InvalidOpcode(opcode)),
                }
            }
            _ => match OPCODES.get(first_byte as usize) {
                Some(info) => (info, u16::from(first_byte)),
                None => return Err(crate::Error::InvalidOpcode(u16::from(first_byte))),
            },
        };

        if info.mnemonic.is_empty() {
            return Err(crate::Error::InvalidOpcode(opcode));
        }

        if info.is_prefix {
            // A prefix never stands alone; consume its operand bytes and continue
            // to the real instruction it modifies.
            read_operand(parser, info.operand)?;
            prefixes.push(opcode);
            continue;
        }

        let operand = read_operand(parser, info.operand)?;
        let size = parser.pos() as u32 - start;

        return Ok(Instruction {
            offset: start,
            size,
            opcode,
            mnemonic: info.mnemonic,
            branch: info.branch,
            operand,
            prefixes,
        });
    }
}

/// Reads the operand bytes dictated by `kind`, resolving branch displacements
/// against the instruction-end position.
fn read_operand(parser: &mut Parser, kind: OperandKind) -> Result<Operand> {
    Ok(match kind {
        OperandKind::None => Operand::None,
        OperandKind::Int8 => Operand::Int(i64::from(parser.read_le::<i8>()?)),
        OperandKind::UInt8 => Operand::UInt(u64::from(parser.read_le::<u8>()?)),
        OperandKind::UInt16 => Operand::UInt(u64::from(parser.read_le::<u16>()?)),
        OperandKind::Int32 => Operand::Int(i64::from(parser.read_le::<i32>()?)),
        OperandKind::Int64 => Operand::Int(parser.read_le::<i64>()?),
        OperandKind::Float32 => Operand::Float32(parser.read_le::<f32>()?),
        OperandKind::Float64 => Operand::Float64(parser.read_le::<f64>()?),
        OperandKind::Token => Operand::Token(crate::module::Token::new(parser.read_le::<u32>()?)),
        OperandKind::BranchTarget8 => {
            let rel = i32::from(parser.read_le::<i8>()?);
            let next = parser.pos() as u32;
            Operand::Target(next.wrapping_add_signed(rel))
        }
        OperandKind::BranchTarget32 => {
            let rel = parser.read_le::<i32>()?;
            let next = parser.pos() as u32;
            Operand::Target(next.wrapping_add_signed(rel))
        }
        OperandKind::Switch => {
            let case_count = parser.read_le::<u32>()?;

            let mut relative = Vec::with_capacity(case_count as usize);
            for _ in 0..case_count {
                relative.push(parser.read_le::<i32>()?);
            }

            let next = parser.pos() as u32;
            Operand::Switch(
                relative
                    .into_iter()
                    .map(|rel| next.wrapping_add_signed(rel))
                    .collect(),
            )
        }
    })
}
