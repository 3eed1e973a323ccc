//! Boot-chain layout structs: init table, boot params, loader params, 2BL
//! keys, and the preldr's own sub-layouts. Hand-serialized (no derive
//! macro) because every field sits at a fixed byte offset mandated by the
//! boot ROM, matching how `examples/original_source/src/Bldr.h` lays them
//! out as packed C structs.

use crate::error::BiosError;

pub const INIT_TABLE_HEADER_LEN: usize = 128;
pub const BOOT_PARAMS_LEN: usize = 28;
pub const LOADER_PARAMS_LEN: usize = 68;
pub const BLDR_KEYS_LEN: usize = 48;
pub const BFM_KEY_LEN: usize = 16;
pub const KEY_LEN: usize = 16;
pub const CMDLINE_LEN: usize = 64;

pub const BOOT_PARAMS_SIGNATURE: u32 = 0x7854_794A; // 'J','y','T','x' little-endian

pub const BLDR_ENTRY_BASE: u32 = 0x0009_0000;
pub const BLDR_ENTRY_RANGE: u32 = 24576;

pub const BLDR_KEYS_BASE: u32 = 0x0040_0000;

const PRELDR_LEN: usize = 10752;

fn read_u32_le(buf: &[u8], at: usize) -> Result<u32, BiosError> {
    buf.get(at..at + 4)
        .map(|s| u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
        .ok_or_else(|| BiosError::InvalidBldr(format!("buffer too short to read u32 at {at}")))
}

fn read_u16_le(buf: &[u8], at: usize) -> Result<u16, BiosError> {
    buf.get(at..at + 2)
        .map(|s| u16::from_le_bytes([s[0], s[1]]))
        .ok_or_else(|| BiosError::InvalidBldr(format!("buffer too short to read u16 at {at}")))
}

/// The init table's 128-byte fixed header (the rest of the table is a
/// variable-length run of XCODE instructions, parsed by `xbios-xcode`).
#[derive(Debug, Clone, Copy)]
pub struct InitTable {
    pub revision: u16,
    pub identifier: u8,
    pub kernel_version: u16,
    pub rom_data_table_ptr: u32,
}

/// Identifier bytes recognized at the fixed offset in `InitTable`.
pub const KNOWN_INIT_TABLE_IDENTIFIERS: [u8; 5] = [0x30, 0x46, 0x60, 0x70, 0x80];

const INIT_TABLE_REVISION_OFFSET: usize = 0;
const INIT_TABLE_IDENTIFIER_OFFSET: usize = 2;
const INIT_TABLE_KERNEL_VERSION_OFFSET: usize = 4;
const INIT_TABLE_ROM_DATA_TABLE_PTR_OFFSET: usize = 8;

impl InitTable {
    pub fn parse(buf: &[u8]) -> Result<Self, BiosError> {
        if buf.len() < INIT_TABLE_HEADER_LEN {
            return Err(BiosError::InvalidBldr("init table shorter than 128 bytes".into()));
        }
        let identifier = buf[INIT_TABLE_IDENTIFIER_OFFSET];
        if !KNOWN_INIT_TABLE_IDENTIFIERS.contains(&identifier) {
            return Err(BiosError::InvalidBldr(format!(
                "unrecognized init table identifier byte {identifier:#04x}"
            )));
        }
        Ok(InitTable {
            revision: read_u16_le(buf, INIT_TABLE_REVISION_OFFSET)? as u16,
            identifier,
            kernel_version: read_u16_le(buf, INIT_TABLE_KERNEL_VERSION_OFFSET)?,
            rom_data_table_ptr: read_u32_le(buf, INIT_TABLE_ROM_DATA_TABLE_PTR_OFFSET)?,
        })
    }
}

/// Pointer table embedded in the init table header, located by
/// `InitTable::rom_data_table_ptr`. Layout is a single romulus-style
/// pointer field in this scan's scope; richer tables are out of scope.
#[derive(Debug, Clone, Copy)]
pub struct RomDataTable {
    pub ptr: u32,
}

/// 28-byte boot parameters block embedded in the kernel image.
#[derive(Debug, Clone)]
pub struct BootParams {
    pub krnl_data_size: u32,
    pub inittbl_size: u32,
    pub signature: u32,
    /// Whether `signature` matches `BOOT_PARAMS_SIGNATURE`, reported
    /// independently of size validation so a bad-signature-but-plausible-
    /// sizes bios still parses.
    pub signature_valid: bool,
    pub compressed_kernel_size: u32,
    pub digest: [u8; 20],
}

const BP_KRNL_DATA_SIZE_OFFSET: usize = 0;
const BP_INITTBL_SIZE_OFFSET: usize = 4;
const BP_SIGNATURE_OFFSET: usize = 8;
const BP_COMPRESSED_KERNEL_SIZE_OFFSET: usize = 12;
const BP_DIGEST_OFFSET: usize = 16;
const BP_DIGEST_LEN: usize = 20;

impl BootParams {
    pub fn parse(buf: &[u8]) -> Result<Self, BiosError> {
        if buf.len() < BOOT_PARAMS_LEN {
            return Err(BiosError::InvalidBldr("boot params shorter than 28 bytes".into()));
        }
        // Sizes are parsed unconditionally even when the signature is
        // wrong -- validity of each is reported independently.
        let signature = read_u32_le(buf, BP_SIGNATURE_OFFSET)?;
        let mut digest = [0u8; 20];
        digest.copy_from_slice(&buf[BP_DIGEST_OFFSET..BP_DIGEST_OFFSET + BP_DIGEST_LEN]);
        Ok(BootParams {
            krnl_data_size: read_u32_le(buf, BP_KRNL_DATA_SIZE_OFFSET)?,
            inittbl_size: read_u32_le(buf, BP_INITTBL_SIZE_OFFSET)?,
            signature,
            signature_valid: signature == BOOT_PARAMS_SIGNATURE,
            compressed_kernel_size: read_u32_le(buf, BP_COMPRESSED_KERNEL_SIZE_OFFSET)?,
            digest,
        })
    }

    pub fn serialize(&self) -> [u8; BOOT_PARAMS_LEN] {
        let mut out = [0u8; BOOT_PARAMS_LEN];
        out[BP_KRNL_DATA_SIZE_OFFSET..BP_KRNL_DATA_SIZE_OFFSET + 4]
            .copy_from_slice(&self.krnl_data_size.to_le_bytes());
        out[BP_INITTBL_SIZE_OFFSET..BP_INITTBL_SIZE_OFFSET + 4]
            .copy_from_slice(&self.inittbl_size.to_le_bytes());
        out[BP_SIGNATURE_OFFSET..BP_SIGNATURE_OFFSET + 4]
            .copy_from_slice(&self.signature.to_le_bytes());
        out[BP_COMPRESSED_KERNEL_SIZE_OFFSET..BP_COMPRESSED_KERNEL_SIZE_OFFSET + 4]
            .copy_from_slice(&self.compressed_kernel_size.to_le_bytes());
        out[BP_DIGEST_OFFSET..BP_DIGEST_OFFSET + BP_DIGEST_LEN].copy_from_slice(&self.digest);
        out
    }
}

/// 68-byte loader parameters block: the 2BL's own entry address plus a
/// null-padded ASCII command line.
#[derive(Debug, Clone)]
pub struct LoaderParams {
    pub bldr_entry_point: u32,
    pub cmdline: [u8; CMDLINE_LEN],
}

const LP_BLDR_ENTRY_POINT_OFFSET: usize = 0;
const LP_CMDLINE_OFFSET: usize = 4;

impl LoaderParams {
    pub fn parse(buf: &[u8]) -> Result<Self, BiosError> {
        if buf.len() < LOADER_PARAMS_LEN {
            return Err(BiosError::InvalidBldr("loader params shorter than 68 bytes".into()));
        }
        let bldr_entry_point = read_u32_le(buf, LP_BLDR_ENTRY_POINT_OFFSET)?;
        if !(BLDR_ENTRY_BASE..BLDR_ENTRY_BASE + BLDR_ENTRY_RANGE).contains(&bldr_entry_point) {
            return Err(BiosError::InvalidBldr(format!(
                "2bl entry point {bldr_entry_point:#010x} outside [{BLDR_ENTRY_BASE:#010x}, {:#010x})",
                BLDR_ENTRY_BASE + BLDR_ENTRY_RANGE
            )));
        }
        let mut cmdline = [0u8; CMDLINE_LEN];
        cmdline.copy_from_slice(&buf[LP_CMDLINE_OFFSET..LP_CMDLINE_OFFSET + CMDLINE_LEN]);
        Ok(LoaderParams {
            bldr_entry_point,
            cmdline,
        })
    }

    pub fn serialize(&self) -> [u8; LOADER_PARAMS_LEN] {
        let mut out = [0u8; LOADER_PARAMS_LEN];
        out[LP_BLDR_ENTRY_POINT_OFFSET..LP_BLDR_ENTRY_POINT_OFFSET + 4]
            .copy_from_slice(&self.bldr_entry_point.to_le_bytes());
        out[LP_CMDLINE_OFFSET..LP_CMDLINE_OFFSET + CMDLINE_LEN].copy_from_slice(&self.cmdline);
        out
    }
}

/// The 2BL's entry descriptor: a pointer to its key block plus the boot
/// flow manager's own entry point.
#[derive(Debug, Clone, Copy)]
pub struct BldrEntry {
    pub keys_ptr: u32,
    pub bfm_entry_point: u32,
}

impl BldrEntry {
    pub fn parse(buf: &[u8], at: usize) -> Result<Self, BiosError> {
        Ok(BldrEntry {
            keys_ptr: read_u32_le(buf, at)?,
            bfm_entry_point: read_u32_le(buf, at + 4)?,
        })
    }

    /// Offset of the key block within the 2BL image, given its mapped
    /// base address of `BLDR_KEYS_BASE`.
    pub fn keys_offset(&self) -> Option<usize> {
        (self.keys_ptr as i64 - BLDR_KEYS_BASE as i64)
            .try_into()
            .ok()
    }
}

/// 48-byte key block (preceded in memory by a 16-byte BFM key, which this
/// struct does not include -- callers read it separately at `offset - 16`).
#[derive(Debug, Clone, Copy)]
pub struct BldrKeys {
    pub eeprom_key: [u8; KEY_LEN],
    pub cert_key: [u8; KEY_LEN],
    pub kernel_key: [u8; KEY_LEN],
}

impl BldrKeys {
    pub fn parse(buf: &[u8]) -> Result<Self, BiosError> {
        if buf.len() < BLDR_KEYS_LEN {
            return Err(BiosError::InvalidBldr("key block shorter than 48 bytes".into()));
        }
        let mut eeprom_key = [0u8; KEY_LEN];
        let mut cert_key = [0u8; KEY_LEN];
        let mut kernel_key = [0u8; KEY_LEN];
        eeprom_key.copy_from_slice(&buf[0..16]);
        cert_key.copy_from_slice(&buf[16..32]);
        kernel_key.copy_from_slice(&buf[32..48]);
        Ok(BldrKeys {
            eeprom_key,
            cert_key,
            kernel_key,
        })
    }
}

/// Parameters particular to a preldr-carrying 2BL: identified by a 5-byte
/// near-jump `E9` at offset 0 of the trailing [`PRELDR_LEN`]-byte region.
#[derive(Debug, Clone, Copy)]
pub struct PreldrParams {
    pub real_base: u32,
}

const PRELDR_JMP_OPCODE: u8 = 0xE9;

impl PreldrParams {
    /// Returns the preldr region (last 10752 bytes) of a 2BL image, if the
    /// near-jump signature is present at its start.
    pub fn detect(bldr: &[u8]) -> Option<&[u8]> {
        if bldr.len() < PRELDR_LEN {
            return None;
        }
        let region = &bldr[bldr.len() - PRELDR_LEN..];
        if region[0] == PRELDR_JMP_OPCODE {
            Some(region)
        } else {
            None
        }
    }

    pub fn real_base() -> u32 {
        0xFFFF_FFFFu32
            .wrapping_sub(512)
            .wrapping_sub(PRELDR_LEN as u32)
            .wrapping_add(1)
    }
}

/// Pointer block embedded near the start of the preldr, re-anchoring the
/// boot-params pointer by -16 bytes relative to the un-preldr'd 2BL.
#[derive(Debug, Clone, Copy)]
pub struct PreldrPtrBlock {
    pub boot_params_ptr: u32,
}

/// Function-pointer block the preldr exposes to the rest of the boot
/// chain once it hands off control.
#[derive(Debug, Clone, Copy)]
pub struct PreldrFuncBlock {
    pub entry_ptr: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_table_rejects_unknown_identifier() {
        let mut buf = vec![0u8; INIT_TABLE_HEADER_LEN];
        buf[INIT_TABLE_IDENTIFIER_OFFSET] = 0xFF;
        assert!(InitTable::parse(&buf).is_err());
    }

    #[test]
    fn init_table_accepts_known_identifier() {
        let mut buf = vec![0u8; INIT_TABLE_HEADER_LEN];
        buf[INIT_TABLE_IDENTIFIER_OFFSET] = 0x70;
        let t = InitTable::parse(&buf).unwrap();
        assert_eq!(t.identifier, 0x70);
    }

    #[test]
    fn boot_params_round_trips() {
        let bp = BootParams {
            krnl_data_size: 123456,
            inittbl_size: 4096,
            signature: BOOT_PARAMS_SIGNATURE,
            signature_valid: true,
            compressed_kernel_size: 98765,
            digest: [0x42; 20],
        };
        let bytes = bp.serialize();
        let parsed = BootParams::parse(&bytes).unwrap();
        assert_eq!(parsed.krnl_data_size, bp.krnl_data_size);
        assert_eq!(parsed.digest, bp.digest);
        assert!(parsed.signature_valid);
    }

    #[test]
    fn boot_params_reports_bad_signature_without_failing() {
        let mut bytes = [0u8; BOOT_PARAMS_LEN];
        bytes[BP_SIGNATURE_OFFSET..BP_SIGNATURE_OFFSET + 4].copy_from_slice(&0u32.to_le_bytes());
        let parsed = BootParams::parse(&bytes).unwrap();
        assert!(!parsed.signature_valid);
        assert_eq!(parsed.krnl_data_size, 0);
    }

    #[test]
    fn loader_params_rejects_out_of_range_entry() {
        let mut bytes = [0u8; LOADER_PARAMS_LEN];
        bytes[0..4].copy_from_slice(&0u32.to_le_bytes());
        assert!(LoaderParams::parse(&bytes).is_err());
    }

    #[test]
    fn loader_params_round_trips() {
        let mut cmdline = [0u8; CMDLINE_LEN];
        cmdline[0..5].copy_from_slice(b"boot ");
        let lp = LoaderParams {
            bldr_entry_point: BLDR_ENTRY_BASE + 100,
            cmdline,
        };
        let bytes = lp.serialize();
        let parsed = LoaderParams::parse(&bytes).unwrap();
        assert_eq!(parsed.bldr_entry_point, lp.bldr_entry_point);
        assert_eq!(parsed.cmdline, lp.cmdline);
    }

    #[test]
    fn preldr_detected_by_jump_opcode() {
        let mut bldr = vec![0u8; PRELDR_LEN + 100];
        let start = bldr.len() - PRELDR_LEN;
        bldr[start] = PRELDR_JMP_OPCODE;
        assert!(PreldrParams::detect(&bldr).is_some());
    }

    #[test]
    fn preldr_not_detected_without_jump_opcode() {
        let bldr = vec![0u8; PRELDR_LEN + 100];
        assert!(PreldrParams::detect(&bldr).is_none());
    }

    #[test]
    fn keys_offset_computes_from_base() {
        let entry = BldrEntry {
            keys_ptr: BLDR_KEYS_BASE + 1000,
            bfm_entry_point: 0,
        };
        assert_eq!(entry.keys_offset(), Some(1000));
    }
}
