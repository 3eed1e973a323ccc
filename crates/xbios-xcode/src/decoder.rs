//! Two-pass, settings-driven textual disassembler built atop
//! [`crate::interp::XcodeInterp`].
//!
//! Pass 1 rewrites every `jmp`/`jne`'s relative `data` field into an
//! absolute XCODE-stream offset and assigns each unique target a
//! `lb_<NN>` label, per `examples/original_source/src/XcodeInterp.cpp`'s
//! `decodeXcodes`. Pass 2 emits one line per XCODE through `format_str`.
//! Unlike the original's fixed two-digit `lb_%02d`, the label width is
//! sized to the number of labels actually produced.

use std::collections::HashMap;

use crate::error::XcodeError;
use crate::interp::XcodeInterp;
use crate::settings::DecodeSettings;
use crate::xcode::{Opcode, Xcode, XCODE_LEN};

#[derive(Debug, Clone)]
struct DecodedXcode {
    offset: usize,
    xcode: Xcode,
    prev: Option<Xcode>,
}

fn label_name(index: usize, width: usize) -> String {
    format!("lb_{index:0width$}")
}

/// Runs both passes and rewrites branch `data` fields in place, returning
/// the decoded stream plus an offset-to-label-name table.
fn fixup_labels(data: &[u8]) -> Result<(Vec<DecodedXcode>, HashMap<usize, String>), XcodeError> {
    let mut interp = XcodeInterp::new();
    interp.load(data)?;

    let mut decoded = Vec::new();
    let mut prev: Option<Xcode> = None;
    let mut targets: Vec<usize> = Vec::new();

    loop {
        let offset = interp.get_offset();
        match interp.interpret_next()? {
            None => break,
            Some(mut xcode) => {
                if xcode.is_branch() {
                    let next_offset = interp.get_offset();
                    let target = (next_offset as u32).wrapping_add(xcode.data) as usize;
                    xcode.data = target as u32;
                    if !targets.contains(&target) {
                        targets.push(target);
                    }
                }
                decoded.push(DecodedXcode {
                    offset,
                    xcode,
                    prev,
                });
                prev = Some(xcode);
            }
        }
    }

    let width = targets.len().to_string().len().max(1);
    let labels: HashMap<usize, String> = targets
        .iter()
        .enumerate()
        .map(|(i, &offset)| (offset, label_name(i, width)))
        .collect();

    Ok((decoded, labels))
}

/// Literal `(opcode, addr, addr-mask, data)` comment patterns, first-hit
/// wins. A representative subset of
/// `examples/original_source/src/XcodeDecoder.cpp`'s `XC_WRITE_COMMENT*`
/// table -- the full table runs to dozens of platform-specific pokes; this
/// keeps the ones that appear in every retail init table.
struct CommentRule {
    opcode: Opcode,
    addr: u32,
    addr_mask: u32,
    data: Option<u32>,
    comment: &'static str,
}

const SMB_BASE: u32 = 0xC000;
const NV2A_BASE: u32 = 0x0F00_0000;

const COMMENT_RULES: &[CommentRule] = &[
    CommentRule {
        opcode: Opcode::Jne,
        addr: 0x10,
        addr_mask: 0xFFFF_FFFF,
        data: Some(0xFFFF_FFEE),
        comment: "spin until smbus is ready",
    },
    CommentRule {
        opcode: Opcode::IoRead,
        addr: SMB_BASE,
        addr_mask: 0xFFFF_FFFF,
        data: None,
        comment: "smbus read status",
    },
    CommentRule {
        opcode: Opcode::IoWrite,
        addr: SMB_BASE,
        addr_mask: 0xFFFF_FFFF,
        data: Some(0x10),
        comment: "smbus clear status",
    },
    CommentRule {
        opcode: Opcode::IoWrite,
        addr: SMB_BASE + 0x08,
        addr_mask: 0xFFFF_FFFF,
        data: None,
        comment: "smbus set cmd",
    },
    CommentRule {
        opcode: Opcode::IoWrite,
        addr: SMB_BASE + 0x06,
        addr_mask: 0xFFFF_FFFF,
        data: None,
        comment: "smbus set val",
    },
    CommentRule {
        opcode: Opcode::IoWrite,
        addr: SMB_BASE + 0x02,
        addr_mask: 0xFFFF_FFFF,
        data: Some(0x0A),
        comment: "smbus kickoff",
    },
    CommentRule {
        opcode: Opcode::PciWrite,
        addr: 0x8000_0884,
        addr_mask: 0xFFFF_FFFF,
        data: Some(0x8001),
        comment: "setup io bar (rev >= C03)",
    },
    CommentRule {
        opcode: Opcode::PciWrite,
        addr: 0x8000_0810,
        addr_mask: 0xFFFF_FFFF,
        data: Some(0x8001),
        comment: "setup io bar (rev < C03)",
    },
    CommentRule {
        opcode: Opcode::PciWrite,
        addr: 0x8000_0804,
        addr_mask: 0xFFFF_FFFF,
        data: Some(0x03),
        comment: "enable io space",
    },
    CommentRule {
        opcode: Opcode::IoWrite,
        addr: 0x8049,
        addr_mask: 0xFFFF_FFFF,
        data: Some(0x08),
        comment: "disable the tco timer",
    },
    CommentRule {
        opcode: Opcode::MemRead,
        addr: NV2A_BASE,
        addr_mask: 0xFFFF_FFFF,
        data: None,
        comment: "PCM_BOOT_0",
    },
    CommentRule {
        opcode: Opcode::MemWrite,
        addr: NV2A_BASE + 0x1214,
        addr_mask: 0xFFFF_FFFF,
        data: Some(0x2828_2828),
        comment: "configure for micron",
    },
    CommentRule {
        opcode: Opcode::MemWrite,
        addr: NV2A_BASE + 0x1214,
        addr_mask: 0xFFFF_FFFF,
        data: Some(0x0909_0909),
        comment: "configure for samsung",
    },
    CommentRule {
        opcode: Opcode::Exit,
        addr: 0x806,
        addr_mask: 0xFFFF_FFFF,
        data: None,
        comment: "end of xcodes",
    },
];

fn comment_for(entry: &DecodedXcode) -> Option<&'static str> {
    for rule in COMMENT_RULES {
        if entry.xcode.opcode == rule.opcode
            && (entry.xcode.addr & rule.addr_mask) == rule.addr
            && rule.data.map(|d| d == entry.xcode.data).unwrap_or(true)
        {
            return Some(rule.comment);
        }
    }
    None
}

fn format_template(
    template: &str,
    offset: &str,
    op: &str,
    addr: &str,
    data: &str,
    comment: &str,
) -> String {
    template
        .replace("{offset}", offset)
        .replace("{op}", op)
        .replace("{addr}", addr)
        .replace("{data}", data)
        .replace("{comment}", comment)
}

/// Disassembles an XCODE stream into one formatted line per instruction.
pub fn disassemble(data: &[u8], settings: &DecodeSettings) -> Result<Vec<String>, XcodeError> {
    let (decoded, labels) = fixup_labels(data)?;
    let mut lines = Vec::with_capacity(decoded.len());

    for entry in &decoded {
        let op_str = settings.mnemonic(entry.xcode.opcode).to_string();

        let addr_str = if entry.xcode.opcode == Opcode::Jmp {
            labels
                .get(&(entry.xcode.data as usize))
                .map(|name| settings.jmp_str.replace("{label}", name))
                .unwrap_or_else(|| settings.no_operand_str.clone())
        } else {
            settings.num_format.format(entry.xcode.addr)
        };

        let data_str = match entry.xcode.opcode {
            Opcode::MemRead | Opcode::IoRead | Opcode::PciRead | Opcode::Exit => {
                settings.no_operand_str.clone()
            }
            Opcode::Jne => labels
                .get(&(entry.xcode.data as usize))
                .map(|name| settings.jmp_str.replace("{label}", name))
                .unwrap_or_else(|| settings.no_operand_str.clone()),
            Opcode::Jmp => settings.no_operand_str.clone(),
            _ => settings.num_format.format(entry.xcode.data),
        };

        let comment = comment_for(entry)
            .map(|c| format!("{}{}", settings.comment_prefix, c))
            .unwrap_or_default();

        let offset_str = settings.num_format.format(entry.offset as u32);

        let label_prefix = labels.get(&entry.offset).cloned();

        let body = format_template(&settings.format_str, &offset_str, &op_str, &addr_str, &data_str, &comment);

        match label_prefix {
            Some(name) if settings.label_on_new_line => {
                lines.push(format!("{name}:"));
                lines.push(body);
            }
            Some(name) => {
                lines.push(format!("{name}: {body}"));
            }
            None => lines.push(body),
        }
    }

    Ok(lines)
}

pub const XCODE_INSTRUCTION_LEN: usize = XCODE_LEN;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xcode::Opcode;

    fn xc(opcode: Opcode, addr: u32, data: u32) -> [u8; XCODE_LEN] {
        Xcode { opcode, addr, data }.serialize()
    }

    #[test]
    fn disassembles_a_straight_line_program() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&xc(Opcode::MemWrite, 0x1000, 0x2222));
        bytes.extend_from_slice(&xc(Opcode::Exit, 0, 0));

        let settings = DecodeSettings::default();
        let lines = disassemble(&bytes, &settings).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("mem_write"));
        assert!(lines[1].contains("exit"));
    }

    #[test]
    fn resolves_a_backward_jmp_to_a_label() {
        // xcode 0: jmp -9 (back to itself's own offset)
        // xcode 1: exit
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&xc(Opcode::Jmp, 0, (-9i32) as u32));
        bytes.extend_from_slice(&xc(Opcode::Exit, 0, 0));

        let settings = DecodeSettings::default();
        let lines = disassemble(&bytes, &settings).unwrap();
        assert!(lines[0].contains("lb_0"));
        assert!(lines[0].contains("jmp"));
    }

    #[test]
    fn known_comment_is_attached() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&xc(Opcode::Exit, 0x806, 0));

        let settings = DecodeSettings::default();
        let lines = disassemble(&bytes, &settings).unwrap();
        assert!(lines[0].contains("end of xcodes"));
    }

    #[test]
    fn label_on_new_line_emits_two_lines_for_target() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&xc(Opcode::Jmp, 0, (-9i32) as u32));
        bytes.extend_from_slice(&xc(Opcode::Exit, 0, 0));

        let mut settings = DecodeSettings::default();
        settings.label_on_new_line = true;
        let lines = disassemble(&bytes, &settings).unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with(':'));
    }
}
