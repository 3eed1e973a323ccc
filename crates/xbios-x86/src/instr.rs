//! The ~25-entry instruction table, ported bit-exact from
//! `examples/original_source/src/X86Interp.cpp`'s `instrs[]`: each entry's
//! opcode bytes are matched in order, first-hit wins, exactly like the
//! original's linear `xb_cmp` scan.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrShape {
    /// Bare mnemonic, no operand (`nop`, `cld`, `jmp eax`, `rep movsd`).
    Bare,
    /// `mnemonic, [0xXXXXXXXX]` -- a 4-byte pointer operand follows the
    /// opcode bytes.
    Ptr,
    /// `mnemonic, 0xXXXXXXXX` -- a 4-byte immediate follows the opcode
    /// bytes.
    Imm,
    /// `mnemonic, 0xXXXXXXXX 0xXXXX` -- a far jump's 4-byte offset plus
    /// 2-byte segment selector.
    JmpFar,
}

pub struct InstrEntry {
    /// Opcode bytes in instruction-stream order (1 or 2 bytes).
    pub opcode: &'static [u8],
    pub mnemonic: &'static str,
    pub shape: InstrShape,
}

/// `operand_len` in the original is folded into [`InstrShape`]; the table
/// order matches `instrs[]` exactly so matching precedence is identical.
pub const INSTR_TABLE: &[InstrEntry] = &[
    InstrEntry { opcode: &[0x8B, 0x1D], mnemonic: "mov ebx", shape: InstrShape::Ptr },
    InstrEntry { opcode: &[0x8B, 0x0D], mnemonic: "mov ecx", shape: InstrShape::Ptr },
    InstrEntry { opcode: &[0x8B, 0x15], mnemonic: "mov edx", shape: InstrShape::Ptr },
    InstrEntry { opcode: &[0xFF, 0xE0], mnemonic: "jmp eax", shape: InstrShape::Bare },
    InstrEntry { opcode: &[0xFF, 0xE1], mnemonic: "jmp ecx", shape: InstrShape::Bare },
    InstrEntry { opcode: &[0xFF, 0xE2], mnemonic: "jmp edx", shape: InstrShape::Bare },
    InstrEntry { opcode: &[0xFF, 0xE3], mnemonic: "jmp ebx", shape: InstrShape::Bare },
    InstrEntry { opcode: &[0xFF, 0xE4], mnemonic: "jmp esp", shape: InstrShape::Bare },
    InstrEntry { opcode: &[0xFF, 0xE5], mnemonic: "jmp ebp", shape: InstrShape::Bare },
    InstrEntry { opcode: &[0xFF, 0xE6], mnemonic: "jmp esi", shape: InstrShape::Bare },
    InstrEntry { opcode: &[0xFF, 0xE7], mnemonic: "jmp edi", shape: InstrShape::Bare },
    InstrEntry { opcode: &[0xF3, 0xA5], mnemonic: "rep movsd", shape: InstrShape::Bare },
    InstrEntry { opcode: &[0xB8], mnemonic: "mov eax", shape: InstrShape::Imm },
    InstrEntry { opcode: &[0xB9], mnemonic: "mov ecx", shape: InstrShape::Imm },
    InstrEntry { opcode: &[0xBA], mnemonic: "mov edx", shape: InstrShape::Imm },
    InstrEntry { opcode: &[0xBB], mnemonic: "mov ebx", shape: InstrShape::Imm },
    InstrEntry { opcode: &[0xBC], mnemonic: "mov esp", shape: InstrShape::Imm },
    InstrEntry { opcode: &[0xBD], mnemonic: "mov ebp", shape: InstrShape::Imm },
    InstrEntry { opcode: &[0xBE], mnemonic: "mov esi", shape: InstrShape::Imm },
    InstrEntry { opcode: &[0xBF], mnemonic: "mov edi", shape: InstrShape::Imm },
    InstrEntry { opcode: &[0xA1], mnemonic: "mov eax", shape: InstrShape::Ptr },
    InstrEntry { opcode: &[0xEA], mnemonic: "jmp far", shape: InstrShape::JmpFar },
    InstrEntry { opcode: &[0x90], mnemonic: "nop", shape: InstrShape::Bare },
    InstrEntry { opcode: &[0xFC], mnemonic: "cld", shape: InstrShape::Bare },
];

pub fn match_at(data: &[u8], offset: usize) -> Option<&'static InstrEntry> {
    INSTR_TABLE
        .iter()
        .find(|entry| data[offset..].starts_with(entry.opcode))
}
