//! MCPX mask-ROM identification.
//!
//! Classifies a 512-byte mask-ROM dump by SHA-1 digest equality against a
//! small set of known images, per the data-model's "MCPX image" entry.
//! This diverges intentionally from `examples/original_source/src/Mcpx.cpp`'s
//! `verifyMCPX`, which instead compares raw 4-byte magic constants at fixed
//! offsets plus a secondary signature byte -- see DESIGN.md. The four
//! reference digests below are **placeholders**: no real MCPX ROM dumps
//! were available to hash during development, so these do not match any
//! genuine console image. Replace them with the real digests before relying
//! on this classifier against hardware dumps.

use xbios_crypto::sha1;

use crate::error::BiosError;

pub const MCPX_SIZE: usize = 512;

const SB_KEY_LEN: usize = 16;
const SB_KEY_OFFSET_V1_0: usize = 0x1A5;
const SB_KEY_OFFSET_V1_1: usize = 0x19C;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpxRevision {
    V1_0,
    V1_1,
}

impl McpxRevision {
    pub fn sb_key_offset(self) -> usize {
        match self {
            McpxRevision::V1_0 => SB_KEY_OFFSET_V1_0,
            McpxRevision::V1_1 => SB_KEY_OFFSET_V1_1,
        }
    }
}

/// Known-good MCPX digests. Placeholders -- see module doc comment.
const KNOWN_DIGESTS: [([u8; 20], McpxRevision); 4] = [
    (
        [
            0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11,
            0x11, 0x11, 0x11, 0x11, 0x11, 0x11,
        ],
        McpxRevision::V1_0,
    ),
    (
        [
            0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22,
            0x22, 0x22, 0x22, 0x22, 0x22, 0x22,
        ],
        McpxRevision::V1_0,
    ),
    (
        [
            0x33, 0x33, 0x33, 0x33, 0x33, 0x33, 0x33, 0x33, 0x33, 0x33, 0x33, 0x33, 0x33, 0x33,
            0x33, 0x33, 0x33, 0x33, 0x33, 0x33,
        ],
        McpxRevision::V1_1,
    ),
    (
        [
            0x44, 0x44, 0x44, 0x44, 0x44, 0x44, 0x44, 0x44, 0x44, 0x44, 0x44, 0x44, 0x44, 0x44,
            0x44, 0x44, 0x44, 0x44, 0x44, 0x44,
        ],
        McpxRevision::V1_1,
    ),
];

#[derive(Debug, Clone, Copy)]
pub struct McpxInfo {
    pub revision: McpxRevision,
    pub sb_key_offset: usize,
}

/// Classifies a 512-byte MCPX dump, returning its revision and the offset
/// of its embedded 16-byte secret-boot key.
pub fn identify(buf: &[u8]) -> Result<McpxInfo, BiosError> {
    if buf.len() != MCPX_SIZE {
        return Err(BiosError::InvalidMcpx);
    }

    let digest = sha1(buf);
    for (known, revision) in KNOWN_DIGESTS {
        if known == digest {
            log::debug!("identified mcpx image as {revision:?}");
            return Ok(McpxInfo {
                revision,
                sb_key_offset: revision.sb_key_offset(),
            });
        }
    }

    log::warn!("mcpx digest {} matches no known image", hex(&digest));
    Err(BiosError::InvalidMcpx)
}

/// Returns a view of the 16-byte secret-boot key embedded in `buf`.
pub fn secret_boot_key(buf: &[u8], info: McpxInfo) -> Result<&[u8], BiosError> {
    let start = info.sb_key_offset;
    buf.get(start..start + SB_KEY_LEN)
        .ok_or_else(|| BiosError::InvalidMcpx)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digests_classify_correctly() {
        for (digest_bytes, revision) in KNOWN_DIGESTS {
            // We don't have real 512-byte preimages for these placeholder
            // digests, so exercise the comparison logic directly instead
            // of round-tripping through sha1().
            let found = KNOWN_DIGESTS
                .iter()
                .find(|(d, _)| *d == digest_bytes)
                .map(|(_, r)| *r);
            assert_eq!(found, Some(revision));
        }
    }

    #[test]
    fn wrong_length_is_invalid() {
        assert!(identify(&[0u8; 511]).is_err());
    }

    #[test]
    fn unknown_digest_is_invalid() {
        let buf = vec![0xABu8; MCPX_SIZE];
        assert!(identify(&buf).is_err());
    }

    #[test]
    fn one_byte_flip_still_invalid() {
        let mut buf = vec![0x00u8; MCPX_SIZE];
        buf[100] ^= 0x01;
        assert!(identify(&buf).is_err());
    }
}
