//! Builds the synthetic RAM buffer the x86 sub-interpreter disassembles:
//! replay every `mem_write` XCODE whose `addr` falls in range, writing the
//! 4-byte `data` field little-endian at that offset. Grounded on spec.md
//! §4.9 ("the visor trick") and the `mem_write` semantics XCODEs already
//! carry in `xbios-xcode::xcode::Opcode::MemWrite`.

use xbios_xcode::{Opcode, Xcode};

use crate::error::X86Error;

/// Replays every in-range `mem_write` XCODE into a zero-initialized
/// buffer of `size` bytes.
pub fn build_visor_ram(xcodes: &[Xcode], size: usize) -> Result<Vec<u8>, X86Error> {
    if size == 0 {
        return Err(X86Error::BufferOverflow(size));
    }
    let mut buf = vec![0u8; size];

    for xc in xcodes {
        if xc.opcode != Opcode::MemWrite {
            continue;
        }
        let addr = xc.addr as usize;
        if addr + 4 > size {
            continue;
        }
        buf[addr..addr + 4].copy_from_slice(&xc.data.to_le_bytes());
    }

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_in_range_and_skips_out_of_range() {
        let xcodes = vec![
            Xcode {
                opcode: Opcode::MemWrite,
                addr: 0,
                data: 0xDEAD_BEEF,
            },
            Xcode {
                opcode: Opcode::MemWrite,
                addr: 1_000_000,
                data: 0x1111_1111,
            },
            Xcode {
                opcode: Opcode::MemRead,
                addr: 4,
                data: 0x2222_2222,
            },
        ];

        let ram = build_visor_ram(&xcodes, 64).unwrap();
        assert_eq!(&ram[0..4], &0xDEAD_BEEFu32.to_le_bytes());
        assert_eq!(&ram[4..8], &[0u8; 4]);
    }

    #[test]
    fn rejects_zero_size() {
        assert!(build_visor_ram(&[], 0).is_err());
    }
}
