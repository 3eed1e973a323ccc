//! The 9-byte `XCODE` instruction and its opcode enumeration.
//!
//! Grounded on `examples/original_source/inc/XcodeInterp.h`'s `OPCODE`
//! enum and `opcodeMap` field-name table, and `inc/bldr.h`'s `XCODE`
//! struct (`{ UCHAR opcode; UINT addr; UINT data; }`, packed, no padding).

pub const XCODE_LEN: usize = 9;
pub const OPCODE_COUNT: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Reserved,
    MemRead,
    MemWrite,
    PciWrite,
    PciRead,
    AndOr,
    UseResult,
    Jne,
    Jmp,
    Accum,
    IoWrite,
    IoRead,
    Nop80,
    Exit,
    NopF5,
}

impl Opcode {
    pub fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            0x01 => Opcode::Reserved,
            0x02 => Opcode::MemRead,
            0x03 => Opcode::MemWrite,
            0x04 => Opcode::PciWrite,
            0x05 => Opcode::PciRead,
            0x06 => Opcode::AndOr,
            0x07 => Opcode::UseResult,
            0x08 => Opcode::Jne,
            0x09 => Opcode::Jmp,
            0x10 => Opcode::Accum,
            0x11 => Opcode::IoWrite,
            0x12 => Opcode::IoRead,
            0x80 => Opcode::Nop80,
            0xEE => Opcode::Exit,
            0xF5 => Opcode::NopF5,
            _ => return None,
        })
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Opcode::Reserved => 0x01,
            Opcode::MemRead => 0x02,
            Opcode::MemWrite => 0x03,
            Opcode::PciWrite => 0x04,
            Opcode::PciRead => 0x05,
            Opcode::AndOr => 0x06,
            Opcode::UseResult => 0x07,
            Opcode::Jne => 0x08,
            Opcode::Jmp => 0x09,
            Opcode::Accum => 0x10,
            Opcode::IoWrite => 0x11,
            Opcode::IoRead => 0x12,
            Opcode::Nop80 => 0x80,
            Opcode::Exit => 0xEE,
            Opcode::NopF5 => 0xF5,
        }
    }

    /// Default mnemonic, overridable per the settings file's `xc_<name>`
    /// keys -- see [`crate::settings`].
    pub fn default_mnemonic(self) -> &'static str {
        match self {
            Opcode::Reserved => "xc_reserved",
            Opcode::MemRead => "mem_read",
            Opcode::MemWrite => "mem_write",
            Opcode::PciWrite => "pci_write",
            Opcode::PciRead => "pci_read",
            Opcode::AndOr => "and_or",
            Opcode::UseResult => "use_rslt",
            Opcode::Jne => "jne",
            Opcode::Jmp => "jmp",
            Opcode::Accum => "accum",
            Opcode::IoWrite => "io_write",
            Opcode::IoRead => "io_read",
            Opcode::Nop80 => "nop_80",
            Opcode::Exit => "exit",
            Opcode::NopF5 => "nop_f5",
        }
    }

    /// The settings-file key used to override this opcode's mnemonic.
    pub fn settings_key(self) -> &'static str {
        match self {
            Opcode::Reserved => "xc_reserved",
            Opcode::MemRead => "xc_mem_read",
            Opcode::MemWrite => "xc_mem_write",
            Opcode::PciWrite => "xc_pci_write",
            Opcode::PciRead => "xc_pci_read",
            Opcode::AndOr => "xc_and_or",
            Opcode::UseResult => "xc_result",
            Opcode::Jne => "xc_jne",
            Opcode::Jmp => "xc_jmp",
            Opcode::Accum => "xc_accum",
            Opcode::IoWrite => "xc_io_write",
            Opcode::IoRead => "xc_io_read",
            Opcode::Nop80 => "xc_nop_80",
            Opcode::Exit => "xc_exit",
            Opcode::NopF5 => "xc_nop_f5",
        }
    }

    pub const ALL: [Opcode; OPCODE_COUNT] = [
        Opcode::Reserved,
        Opcode::MemRead,
        Opcode::MemWrite,
        Opcode::PciWrite,
        Opcode::PciRead,
        Opcode::AndOr,
        Opcode::UseResult,
        Opcode::Jne,
        Opcode::Jmp,
        Opcode::Accum,
        Opcode::IoWrite,
        Opcode::IoRead,
        Opcode::Nop80,
        Opcode::Exit,
        Opcode::NopF5,
    ];
}

/// One 9-byte init-table instruction: `{ opcode: u8, addr: u32, data: u32 }`,
/// little-endian, no padding.
#[derive(Debug, Clone, Copy)]
pub struct Xcode {
    pub opcode: Opcode,
    pub addr: u32,
    pub data: u32,
}

impl Xcode {
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < XCODE_LEN {
            return None;
        }
        let opcode = Opcode::from_byte(bytes[0])?;
        let addr = u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
        let data = u32::from_le_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]);
        Some(Xcode { opcode, addr, data })
    }

    pub fn serialize(&self) -> [u8; XCODE_LEN] {
        let mut out = [0u8; XCODE_LEN];
        out[0] = self.opcode.to_byte();
        out[1..5].copy_from_slice(&self.addr.to_le_bytes());
        out[5..9].copy_from_slice(&self.data.to_le_bytes());
        out
    }

    /// True for opcodes whose `data` field holds a relative branch offset.
    pub fn is_branch(&self) -> bool {
        matches!(self.opcode, Opcode::Jmp | Opcode::Jne)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_opcode() {
        for op in Opcode::ALL {
            let xc = Xcode {
                opcode: op,
                addr: 0x1234_5678,
                data: 0xDEAD_BEEF,
            };
            let bytes = xc.serialize();
            let parsed = Xcode::parse(&bytes).unwrap();
            assert_eq!(parsed.opcode, op);
            assert_eq!(parsed.addr, xc.addr);
            assert_eq!(parsed.data, xc.data);
        }
    }

    #[test]
    fn unknown_opcode_byte_is_none() {
        let mut bytes = [0u8; XCODE_LEN];
        bytes[0] = 0x99;
        assert!(Xcode::parse(&bytes).is_none());
    }

    #[test]
    fn short_buffer_is_none() {
        assert!(Xcode::parse(&[0u8; 4]).is_none());
    }
}
