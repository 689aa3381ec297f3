//! Static CIL opcode tables.
//!
//! Per-opcode dispatch is a data table (operand shape, branch behavior, prefix flag)
//! instead of scattered conditionals, so exhaustiveness is checkable: every supported
//! opcode has exactly one operand shape and exactly one branch classification.
//!
//! Two tables exist: [`OPCODES`] for single-byte encodings (0x00..=0xE0) and
//! [`OPCODES_FE`] for two-byte encodings reached through the 0xFE escape byte.
//! Reserved entries carry an empty mnemonic and are rejected by the decoder.

use crate::disassembler::instruction::{BranchKind, OperandKind};

/// Static description of one opcode: mnemonic, operand shape, branch behavior,
/// and whether it is a prefix that attaches to the following real instruction.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeInfo {
    /// Instruction mnemonic; empty for reserved encodings.
    pub mnemonic: &'static str,
    /// Operand shape to decode after the opcode header.
    pub operand: OperandKind,
    /// Fixed branch classification.
    pub branch: BranchKind,
    /// Prefix opcodes do not end a logical instruction; they attach to the
    /// following real instruction as a prefix chain.
    pub is_prefix: bool,
}

macro_rules! op {
    ($mnemonic:literal, $operand:ident, $branch:ident) => {
        OpcodeInfo {
            mnemonic: $mnemonic,
            operand: OperandKind::$operand,
            branch: BranchKind::$branch,
            is_prefix: false,
        }
    };
}

macro_rules! prefix {
    ($mnemonic:literal, $operand:ident) => {
        OpcodeInfo {
            mnemonic: $mnemonic,
            operand: OperandKind::$operand,
            branch: BranchKind::NoBranch,
            is_prefix: true,
        }
    };
}

const RESERVED: OpcodeInfo = op!("", None, NoBranch);

/// Single-byte opcode table, indexed by the opcode value (0x00..=0xE0).
pub static OPCODES: [OpcodeInfo; 0xE1] = [
    op!("nop", None, NoBranch),                 // 0x00
    op!("break", None, NoBranch),               // 0x01
    op!("ldarg.0", None, NoBranch),             // 0x02
    op!("ldarg.1", None, NoBranch),             // 0x03
    op!("ldarg.2", None, NoBranch),             // 0x04
    op!("ldarg.3", None, NoBranch),             // 0x05
    op!("ldloc.0", None, NoBranch),             // 0x06
    op!("ldloc.1", None, NoBranch),             // 0x07
    op!("ldloc.2", None, NoBranch),             // 0x08
    op!("ldloc.3", None, NoBranch),             // 0x09
    op!("stloc.0", None, NoBranch),             // 0x0A
    op!("stloc.1", None, NoBranch),             // 0x0B
    op!("stloc.2", None, NoBranch),             // 0x0C
    op!("stloc.3", None, NoBranch),             // 0x0D
    op!("ldarg.s", UInt8, NoBranch),            // 0x0E
    op!("ldarga.s", UInt8, NoBranch),           // 0x0F
    op!("starg.s", UInt8, NoBranch),            // 0x10
    op!("ldloc.s", UInt8, NoBranch),            // 0x11
    op!("ldloca.s", UInt8, NoBranch),           // 0x12
    op!("stloc.s", UInt8, NoBranch),            // 0x13
    op!("ldnull", None, NoBranch),              // 0x14
    op!("ldc.i4.m1", None, NoBranch),           // 0x15
    op!("ldc.i4.0", None, NoBranch),            // 0x16
    op!("ldc.i4.1", None, NoBranch),            // 0x17
    op!("ldc.i4.2", None, NoBranch),            // 0x18
    op!("ldc.i4.3", None, NoBranch),            // 0x19
    op!("ldc.i4.4", None, NoBranch),            // 0x1A
    op!("ldc.i4.5", None, NoBranch),            // 0x1B
    op!("ldc.i4.6", None, NoBranch),            // 0x1C
    op!("ldc.i4.7", None, NoBranch),            // 0x1D
    op!("ldc.i4.8", None, NoBranch),            // 0x1E
    op!("ldc.i4.s", Int8, NoBranch),            // 0x1F
    op!("ldc.i4", Int32, NoBranch),             // 0x20
    op!("ldc.i8", Int64, NoBranch),             // 0x21
    op!("ldc.r4", Float32, NoBranch),           // 0x22
    op!("ldc.r8", Float64, NoBranch),           // 0x23
    RESERVED,                                   // 0x24
    op!("dup", None, NoBranch),                 // 0x25
    op!("pop", None, NoBranch),                 // 0x26
    op!("jmp", Token, Terminates),              // 0x27
    op!("call", Token, NoBranch),               // 0x28
    op!("calli", Token, NoBranch),              // 0x29
    op!("ret", None, Terminates),               // 0x2A
    op!("br.s", BranchTarget8, UnconditionalBranch), // 0x2B
    op!("brfalse.s", BranchTarget8, ConditionalBranch), // 0x2C
    op!("brtrue.s", BranchTarget8, ConditionalBranch), // 0x2D
    op!("beq.s", BranchTarget8, ConditionalBranch), // 0x2E
    op!("bge.s", BranchTarget8, ConditionalBranch), // 0x2F
    op!("bgt.s", BranchTarget8, ConditionalBranch), // 0x30
    op!("ble.s", BranchTarget8, ConditionalBranch), // 0x31
    op!("blt.s", BranchTarget8, ConditionalBranch), // 0x32
    op!("bne.un.s", BranchTarget8, ConditionalBranch), // 0x33
    op!("bge.un.s", BranchTarget8, ConditionalBranch), // 0x34
    op!("bgt.un.s", BranchTarget8, ConditionalBranch), // 0x35
    op!("ble.un.s", BranchTarget8, ConditionalBranch), // 0x36
    op!("blt.un.s", BranchTarget8, ConditionalBranch), // 0x37
    op!("br", BranchTarget32, UnconditionalBranch), // 0x38
    op!("brfalse", BranchTarget32, ConditionalBranch), // 0x39
    op!("brtrue", BranchTarget32, ConditionalBranch), // 0x3A
    op!("beq", BranchTarget32, ConditionalBranch), // 0x3B
    op!("bge", BranchTarget32, ConditionalBranch), // 0x3C
    op!("bgt", BranchTarget32, ConditionalBranch), // 0x3D
    op!("ble", BranchTarget32, ConditionalBranch), // 0x3E
    op!("blt", BranchTarget32, ConditionalBranch), // 0x3F
    op!("bne.un", BranchTarget32, ConditionalBranch), // 0x40
    op!("bge.un", BranchTarget32, ConditionalBranch), // 0x41
    op!("bgt.un", BranchTarget32, ConditionalBranch), // 0x42
    op!("ble.un", BranchTarget32, ConditionalBranch), // 0x43
    op!("blt.un", BranchTarget32, ConditionalBranch), // 0x44
    op!("switch", Switch, ConditionalBranch),   // 0x45
    op!("ldind.i1", None, NoBranch),            // 0x46
    op!("ldind.u1", None, NoBranch),            // 0x47
    op!("ldind.i2", None, NoBranch),            // 0x48
    op!("ldind.u2", None, NoBranch),            // 0x49
    op!("ldind.i4", None, NoBranch),            // 0x4A
    op!("ldind.u4", None, NoBranch),            // 0x4B
    op!("ldind.i8", None, NoBranch),            // 0x4C
    op!("ldind.i", None, NoBranch),             // 0x4D
    op!("ldind.r4", None, NoBranch),            // 0x4E
    op!("ldind.r8", None, NoBranch),            // 0x4F
    op!("ldind.ref", None, NoBranch),           // 0x50
    op!("stind.ref", None, NoBranch),           // 0x51
    op!("stind.i1", None, NoBranch),            // 0x52
    op!("stind.i2", None, NoBranch),            // 0x53
    op!("stind.i4", None, NoBranch),            // 0x54
    op!("stind.i8", None, NoBranch),            // 0x55
    op!("stind.r4", None, NoBranch),            // 0x56
    op!("stind.r8", None, NoBranch),            // 0x57
    op!("add", None, NoBranch),                 // 0x58
    op!("sub", None, NoBranch),                 // 0x59
    op!("mul", None, NoBranch),                 // 0x5A
    op!("div", None, NoBranch),                 // 0x5B
    op!("div.un", None, NoBranch),              // 0x5C
    op!("rem", None, NoBranch),                 // 0x5D
    op!("rem.un", None, NoBranch),              // 0x5E
    op!("and", None, NoBranch),                 // 0x5F
    op!("or", None, NoBranch),                  // 0x60
    op!("xor", None, NoBranch),                 // 0x61
    op!("shl", None, NoBranch),                 // 0x62
    op!("shr", None, NoBranch),                 // 0x63
    op!("shr.un", None, NoBranch),              // 0x64
    op!("neg", None, NoBranch),                 // 0x65
    op!("not", None, NoBranch),                 // 0x66
    op!("conv.i1", None, NoBranch),             // 0x67
    op!("conv.i2", None, NoBranch),             // 0x68
    op!("conv.i4", None, NoBranch),             // 0x69
    op!("conv.i8", None, NoBranch),             // 0x6A
    op!("conv.r4", None, NoBranch),             // 0x6B
    op!("conv.r8", None, NoBranch),             // 0x6C
    op!("conv.u4", None, NoBranch),             // 0x6D
    op!("conv.u8", None, NoBranch),             // 0x6E
    op!("callvirt", Token, NoBranch),           // 0x6F
    op!("cpobj", Token, NoBranch),              // 0x70
    op!("ldobj", Token, NoBranch),              // 0x71
    op!("ldstr", Token, NoBranch),              // 0x72
    op!("newobj", Token, NoBranch),             // 0x73
    op!("castclass", Token, NoBranch),          // 0x74
    op!("isinst", Token, NoBranch),             // 0x75
    op!("conv.r.un", None, NoBranch),           // 0x76
    RESERVED,                                   // 0x77
    RESERVED,                                   // 0x78
    op!("unbox", Token, NoBranch),              // 0x79
    op!("throw", None, Terminates),             // 0x7A
    op!("ldfld", Token, NoBranch),              // 0x7B
    op!("ldflda", Token, NoBranch),             // 0x7C
    op!("stfld", Token, NoBranch),              // 0x7D
    op!("ldsfld", Token, NoBranch),             // 0x7E
    op!("ldsflda", Token, NoBranch),            // 0x7F
    op!("stsfld", Token, NoBranch),             // 0x80
    op!("stobj", Token, NoBranch),              // 0x81
    op!("conv.ovf.i1.un", None, NoBranch),      // 0x82
    op!("conv.ovf.i2.un", None, NoBranch),      // 0x83
    op!("conv.ovf.i4.un", None, NoBranch),      // 0x84
    op!("conv.ovf.i8.un", None, NoBranch),      // 0x85
    op!("conv.ovf.u1.un", None, NoBranch),      // 0x86
    op!("conv.ovf.u2.un", None, NoBranch),      // 0x87
    op!("conv.ovf.u4.un", None, NoBranch),      // 0x88
    op!("conv.ovf.u8.un", None, NoBranch),      // 0x89
    op!("conv.ovf.i.un", None, NoBranch),       // 0x8A
    op!("conv.ovf.u.un", None, NoBranch),       // 0x8B
    op!("box", Token, NoBranch),                // 0x8C
    op!("newarr", Token, NoBranch),             // 0x8D
    op!("ldlen", None, NoBranch),               // 0x8E
    op!("ldelema", Token, NoBranch),            // 0x8F
    op!("ldelem.i1", None, NoBranch),           // 0x90
    op!("ldelem.u1", None, NoBranch),           // 0x91
    op!("ldelem.i2", None, NoBranch),           // 0x92
    op!("ldelem.u2", None, NoBranch),           // 0x93
    op!("ldelem.i4", None, NoBranch),           // 0x94
    op!("ldelem.u4", None, NoBranch),           // 0x95
    op!("ldelem.i8", None, NoBranch),           // 0x96
    op!("ldelem.i", None, NoBranch),            // 0x97
    op!("ldelem.r4", None, NoBranch),           // 0x98
    op!("ldelem.r8", None, NoBranch),           // 0x99
    op!("ldelem.ref", None, NoBranch),          // 0x9A
    op!("stelem.i", None, NoBranch),            // 0x9B
    op!("stelem.i1", None, NoBranch),           // 0x9C
    op!("stelem.i2", None, NoBranch),           // 0x9D
    op!("stelem.i4", None, NoBranch),           // 0x9E
    op!("stelem.i8", None, NoBranch),           // 0x9F
    op!("stelem.r4", None, NoBranch),           // 0xA0
    op!("stelem.r8", None, NoBranch),           // 0xA1
    op!("stelem.ref", None, NoBranch),          // 0xA2
    op!("ldelem", Token, NoBranch),             // 0xA3
    op!("stelem", Token, NoBranch),             // 0xA4
    op!("unbox.any", Token, NoBranch),          // 0xA5
    RESERVED,                                   // 0xA6
    RESERVED,                                   // 0xA7
    RESERVED,                                   // 0xA8
    RESERVED,                                   // 0xA9
    RESERVED,                                   // 0xAA
    RESERVED,                                   // 0xAB
    RESERVED,                                   // 0xAC
    RESERVED,                                   // 0xAD
    RESERVED,                                   // 0xAE
    RESERVED,                                   // 0xAF
    RESERVED,                                   // 0xB0
    RESERVED,                                   // 0xB1
    RESERVED,                                   // 0xB2
    op!("conv.ovf.i1", None, NoBranch),         // 0xB3
    op!("conv.ovf.u1", None, NoBranch),         // 0xB4
    op!("conv.ovf.i2", None, NoBranch),         // 0xB5
    op!("conv.ovf.u2", None, NoBranch),         // 0xB6
    op!("conv.ovf.i4", None, NoBranch),         // 0xB7
    op!("conv.ovf.u4", None, NoBranch),         // 0xB8
    op!("conv.ovf.i8", None, NoBranch),         // 0xB9
    op!("conv.ovf.u8", None, NoBranch),         // 0xBA
    RESERVED,                                   // 0xBB
    RESERVED,                                   // 0xBC
    RESERVED,                                   // 0xBD
    RESERVED,                                   // 0xBE
    RESERVED,                                   // 0xBF
    RESERVED,                                   // 0xC0
    RESERVED,                                   // 0xC1
    op!("refanyval", Token, NoBranch),          // 0xC2
    op!("ckfinite", None, NoBranch),            // 0xC3
    RESERVED,                                   // 0xC4
    RESERVED,                                   // 0xC5
    op!("mkrefany", Token, NoBranch),           // 0xC6
    RESERVED,                                   // 0xC7
    RESERVED,                                   // 0xC8
    RESERVED,                                   // 0xC9
    RESERVED,                                   // 0xCA
    RESERVED,                                   // 0xCB
    RESERVED,                                   // 0xCC
    RESERVED,                                   // 0xCD
    RESERVED,                                   // 0xCE
    RESERVED,                                   // 0xCF
    op!("ldtoken", Token, NoBranch),            // 0xD0
    op!("conv.u2", None, NoBranch),             // 0xD1
    op!("conv.u1", None, NoBranch),             // 0xD2
    op!("conv.i", None, NoBranch),              // 0xD3
    op!("conv.ovf.i", None, NoBranch),          // 0xD4
    op!("conv.ovf.u", None, NoBranch),          // 0xD5
    op!("add.ovf", None, NoBranch),             // 0xD6
    op!("add.ovf.un", None, NoBranch),          // 0xD7
    op!("mul.ovf", None, NoBranch),             // 0xD8
    op!("mul.ovf.un", None, NoBranch),          // 0xD9
    op!("sub.ovf", None, NoBranch),             // 0xDA
    op!("sub.ovf.un", None, NoBranch),          // 0xDB
    op!("endfinally", None, Terminates),        // 0xDC
    op!("leave", BranchTarget32, UnconditionalBranch), // 0xDD
    op!("leave.s", BranchTarget8, UnconditionalBranch), // 0xDE
    op!("stind.i", None, NoBranch),             // 0xDF
    op!("conv.u", None, NoBranch),              // 0xE0
];

/// Two-byte opcode table, indexed by the second byte after the 0xFE escape.
pub static OPCODES_FE: [OpcodeInfo; 0x1F] = [
    op!("arglist", None, NoBranch),             // 0xFE 0x00
    op!("ceq", None, NoBranch),                 // 0xFE 0x01
    op!("cgt", None, NoBranch),                 // 0xFE 0x02
    op!("cgt.un", None, NoBranch),              // 0xFE 0x03
    op!("clt", None, NoBranch),                 // 0xFE 0x04
    op!("clt.un", None, NoBranch),              // 0xFE 0x05
    op!("ldftn", Token, NoBranch),              // 0xFE 0x06
    op!("ldvirtftn", Token, NoBranch),          // 0xFE 0x07
    RESERVED,                                   // 0xFE 0x08
    op!("ldarg", UInt16, NoBranch),             // 0xFE 0x09
    op!("ldarga", UInt16, NoBranch),            // 0xFE 0x0A
    op!("starg", UInt16, NoBranch),             // 0xFE 0x0B
    op!("ldloc", UInt16, NoBranch),             // 0xFE 0x0C
    op!("ldloca", UInt16, NoBranch),            // 0xFE 0x0D
    op!("stloc", UInt16, NoBranch),             // 0xFE 0x0E
    op!("localloc", None, NoBranch),            // 0xFE 0x0F
    RESERVED,                                   // 0xFE 0x10
    op!("endfilter", None, Terminates),         // 0xFE 0x11
    prefix!("unaligned.", UInt8),               // 0xFE 0x12
    prefix!("volatile.", None),                 // 0xFE 0x13
    prefix!("tail.", None),                     // 0xFE 0x14
    op!("initobj", Token, NoBranch),            // 0xFE 0x15
    prefix!("constrained.", Token),             // 0xFE 0x16
    op!("cpblk", None, NoBranch),               // 0xFE 0x17
    op!("initblk", None, NoBranch),             // 0xFE 0x18
    prefix!("no.", UInt8),                      // 0xFE 0x19
    op!("rethrow", None, Terminates),           // 0xFE 0x1A
    RESERVED,                                   // 0xFE 0x1B
    op!("sizeof", Token, NoBranch),             // 0xFE 0x1C
    op!("refanytype", None, NoBranch),          // 0xFE 0x1D
    prefix!("readonly.", None),                 // 0xFE 0x1E
];

/// Looks up the table entry for a full opcode (0xFE escape in the high byte).
///
/// Returns `None` for values outside both tables; reserved entries inside the
/// tables are returned and must be rejected by the caller via their empty mnemonic.
#[must_use]
pub fn opcode_info(opcode: u16) -> Option<&'static OpcodeInfo> {
    if opcode & 0xFF00 == 0xFE00 {
        OPCODES_FE.get((opcode & 0xFF) as usize)
    } else if opcode <= 0xE0 {
        OPCODES.get(opcode as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disassembler::instruction::BranchKind;

    #[test]
    fn table_lengths() {
        assert_eq!(OPCODES.len(), 0xE1);
        assert_eq!(OPCODES_FE.len(), 0x1F);
    }

    #[test]
    fn known_entries() {
        assert_eq!(OPCODES[0x2A].mnemonic, "ret");
        assert_eq!(OPCODES[0x2A].branch, BranchKind::Terminates);
        assert_eq!(OPCODES[0x38].mnemonic, "br");
        assert_eq!(OPCODES[0x38].branch, BranchKind::UnconditionalBranch);
        assert_eq!(OPCODES_FE[0x01].mnemonic, "ceq");
    }

    #[test]
    fn prefixes_marked() {
        assert!(OPCODES_FE[0x13].is_prefix); // volatile.
        assert!(OPCODES_FE[0x16].is_prefix); // constrained.
        assert!(!OPCODES[0x28].is_prefix); // call
    }

    #[test]
    fn reserved_entries_are_empty() {
        assert!(OPCODES[0x24].mnemonic.is_empty());
        assert!(OPCODES_FE[0x08].mnemonic.is_empty());
    }

    #[test]
    fn lookup_by_full_opcode() {
        assert_eq!(opcode_info(0x2A).unwrap().mnemonic, "ret");
        assert_eq!(opcode_info(0xFE01).unwrap().mnemonic, "ceq");
        assert!(opcode_info(0xF0).is_none());
        assert!(opcode_info(0xFE7F).is_none());
    }
}
