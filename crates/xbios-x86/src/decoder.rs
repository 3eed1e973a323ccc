//! Linear x86 disassembler for the visor RAM image. Grounded on
//! `examples/original_source/src/X86Interp.cpp`'s `decodeX86`/`parseInstruction`:
//! scan forward, match the longest-recognized instruction at each offset,
//! format its operand, and stop once six consecutive zero bytes are seen
//! (the original's end-of-code heuristic, since the visor trick doesn't
//! carry an explicit length).

use log::warn;

use crate::instr::{match_at, InstrShape};

const ZERO_RUN_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInstr {
    pub offset: usize,
    pub text: String,
}

/// Result of a full decode pass: the instructions found and whether any
/// byte was skipped as unrecognized (mirrors the original's `unkInstrs`).
#[derive(Debug, Default)]
pub struct DecodeResult {
    pub instructions: Vec<DecodedInstr>,
    pub had_unknown: bool,
}

fn is_zero_run(data: &[u8], offset: usize) -> bool {
    let end = (offset + ZERO_RUN_LEN).min(data.len());
    if end - offset < ZERO_RUN_LEN {
        return false;
    }
    data[offset..end].iter().all(|&b| b == 0)
}

fn format_ptr(mnemonic: &str, bytes: &[u8]) -> String {
    let ptr = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    format!("{mnemonic}, [0x{ptr:08x}]")
}

fn format_imm(mnemonic: &str, bytes: &[u8]) -> String {
    let imm = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    format!("{mnemonic}, 0x{imm:08x}")
}

fn format_jmp_far(bytes: &[u8]) -> String {
    let addr = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let segment = u16::from_le_bytes([bytes[4], bytes[5]]);
    format!("jmp far 0x{segment:04x}:0x{addr:08x}")
}

/// Walks `data` from offset 0, formatting each recognized instruction.
pub fn decode_x86(data: &[u8]) -> DecodeResult {
    let mut result = DecodeResult::default();
    let mut offset = 0usize;

    while offset < data.len() {
        if is_zero_run(data, offset) {
            break;
        }

        match match_at(data, offset) {
            Some(entry) => {
                let opcode_len = entry.opcode.len();
                let operand_start = offset + opcode_len;
                let (text, operand_len) = match entry.shape {
                    InstrShape::Bare => (entry.mnemonic.to_string(), 0),
                    InstrShape::Ptr => {
                        if operand_start + 4 > data.len() {
                            break;
                        }
                        (
                            format_ptr(entry.mnemonic, &data[operand_start..operand_start + 4]),
                            4,
                        )
                    }
                    InstrShape::Imm => {
                        if operand_start + 4 > data.len() {
                            break;
                        }
                        (
                            format_imm(entry.mnemonic, &data[operand_start..operand_start + 4]),
                            4,
                        )
                    }
                    InstrShape::JmpFar => {
                        if operand_start + 6 > data.len() {
                            break;
                        }
                        (format_jmp_far(&data[operand_start..operand_start + 6]), 6)
                    }
                };
                result.instructions.push(DecodedInstr { offset, text });
                offset += opcode_len + operand_len;
            }
            None => {
                warn!("unknown x86 instruction byte 0x{:02x} at offset {offset}", data[offset]);
                result.had_unknown = true;
                offset += 1;
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_mov_imm_then_jmp() {
        let mut data = vec![0xB8, 0xEF, 0xBE, 0xAD, 0xDE]; // mov eax, 0xDEADBEEF
        data.extend_from_slice(&[0xFF, 0xE0]); // jmp eax
        data.extend_from_slice(&[0; ZERO_RUN_LEN]);

        let result = decode_x86(&data);
        assert_eq!(result.instructions.len(), 2);
        assert_eq!(result.instructions[0].text, "mov eax, 0xdeadbeef");
        assert_eq!(result.instructions[1].text, "jmp eax");
        assert!(!result.had_unknown);
    }

    #[test]
    fn stops_at_six_zero_bytes() {
        let mut data = vec![0x90, 0x90];
        data.extend_from_slice(&[0; ZERO_RUN_LEN]);
        data.extend_from_slice(&[0x90]);

        let result = decode_x86(&data);
        assert_eq!(result.instructions.len(), 2);
    }

    #[test]
    fn unknown_byte_is_skipped_and_flagged() {
        let mut data = vec![0xF1, 0x90];
        data.extend_from_slice(&[0; ZERO_RUN_LEN]);

        let result = decode_x86(&data);
        assert!(result.had_unknown);
        assert_eq!(result.instructions.len(), 1);
        assert_eq!(result.instructions[0].offset, 1);
    }

    #[test]
    fn decodes_ptr_operand() {
        let mut data = vec![0x8B, 0x1D, 0x00, 0x00, 0x40, 0x00]; // mov ebx, [0x00400000]
        data.extend_from_slice(&[0; ZERO_RUN_LEN]);

        let result = decode_x86(&data);
        assert_eq!(result.instructions[0].text, "mov ebx, [0x00400000]");
    }

    /// A visor program that loads eax then jumps through it -- the shape
    /// the "mov eax, ...; jmp ..." sequence produced by replaying two
    /// `mem_write` xcodes into RAM and decoding it takes.
    #[test]
    fn visor_style_program_decodes_mov_then_jmp() {
        use xbios_xcode::{Opcode, Xcode};

        let xcodes = vec![
            // bytes 0..8: B8 78 56 34 12 FF E0 00
            Xcode { opcode: Opcode::MemWrite, addr: 0, data: 0x3456_78B8 },
            Xcode { opcode: Opcode::MemWrite, addr: 4, data: 0x00E0_FF12 },
            Xcode { opcode: Opcode::Exit, addr: 0, data: 0 },
        ];
        let ram = crate::visor::build_visor_ram(&xcodes, 16 * 1024).unwrap();

        let result = decode_x86(&ram);
        assert_eq!(result.instructions[0].text, "mov eax, 0x12345678");
        assert_eq!(result.instructions[1].text, "jmp eax");
    }
}
