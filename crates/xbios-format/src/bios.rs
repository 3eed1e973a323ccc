//! The BIOS container engine: classifies a raw image buffer, derives every
//! pointer the data model names, decrypts the 2BL and kernel, and offers
//! `build`/`replicate`/`split`/`combine` for reconstructing images.
//!
//! Grounded on `examples/original_source/src/Bios.cpp`'s `load`/`save`/
//! `replicate`/`extractFile` family, re-expressed with owned buffers and
//! `Result` returns instead of in/out status codes and raw pointers.

use xbios_crypto::rc4;
use xbios_crypto::sha1;

use crate::bldr::{
    BldrEntry, BldrKeys, BootParams, InitTable, LoaderParams, PreldrParams, BLDR_KEYS_LEN,
    BOOT_PARAMS_LEN, INIT_TABLE_HEADER_LEN, KEY_LEN, LOADER_PARAMS_LEN,
};
use crate::error::BiosError;
use crate::mcpx::{self, McpxRevision};

pub const MCPX_SHADOW_LEN: usize = 512;
pub const BLDR_BLOCK_LEN: usize = 24576;
const PRELDR_LEN: usize = 10752;
const PRELDR_ANCHOR_SHIFT: usize = 16;

pub const IMAGE_SIZES: [usize; 3] = [256 * 1024, 512 * 1024, 1024 * 1024];

fn validate_image_size(len: usize) -> Result<(), BiosError> {
    if IMAGE_SIZES.contains(&len) {
        Ok(())
    } else {
        Err(BiosError::InvalidImage { size: len })
    }
}

/// Parameters controlling how [`load`] attempts decryption.
#[derive(Debug, Clone, Default)]
pub struct BiosParams {
    pub key_bldr: Option<[u8; KEY_LEN]>,
    pub key_krnl: Option<[u8; KEY_LEN]>,
    pub mcpx_rev0: Option<[u8; MCPX_SHADOW_LEN]>,
    pub mcpx_rev1: Option<[u8; MCPX_SHADOW_LEN]>,
    /// Exercises the preldr public-key TEA decrypt path. Off by default,
    /// mirroring the original's `#if 0`-gated call site.
    pub decrypt_preldr_pubkey: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BldrDecryptSource {
    Preldr,
    ExplicitKey,
    Mcpx0,
}

/// A loaded, classified BIOS image. Owns exactly one image buffer and
/// optionally one decompressed-kernel buffer, matching the data model's
/// ownership rule.
#[derive(Debug)]
pub struct BiosImage {
    pub buf: Vec<u8>,
    pub romsize: usize,
    pub init_table: InitTable,
    pub has_preldr: bool,
    pub bldr_decrypted: bool,
    pub bldr_decrypt_source: Option<BldrDecryptSource>,
    pub loader_params: Option<LoaderParams>,
    pub bldr_keys: Option<BldrKeys>,
    pub boot_params: Option<BootParams>,
    pub boot_params_valid: bool,
    pub kernel_decrypted: bool,
    pub kernel: Option<Vec<u8>>,
}

impl BiosImage {
    fn bldr_offset(&self) -> usize {
        self.romsize - MCPX_SHADOW_LEN - BLDR_BLOCK_LEN
    }

    fn bldr_block(&self) -> &[u8] {
        let off = self.bldr_offset();
        &self.buf[off..off + BLDR_BLOCK_LEN]
    }

    fn bldr_block_mut(&mut self) -> &mut [u8] {
        let off = self.bldr_offset();
        &mut self.buf[off..off + BLDR_BLOCK_LEN]
    }

    /// Offset, within the 2BL block, of the 28-byte boot-params record.
    /// Re-anchored 16 bytes earlier when a preldr is present.
    fn boot_params_offset(&self) -> usize {
        let base = BLDR_BLOCK_LEN - BOOT_PARAMS_LEN;
        if self.has_preldr {
            base - PRELDR_ANCHOR_SHIFT
        } else {
            base
        }
    }

    pub fn xcode_stream_len(&self) -> usize {
        match &self.boot_params {
            Some(bp) if bp.inittbl_size != 0 => bp.inittbl_size as usize,
            _ => self.romsize - INIT_TABLE_HEADER_LEN,
        }
    }
}

/// `k = SHA1(sbKey || last16 || (sbKey XOR 0x5C repeated 16x))`, truncated
/// to 20 bytes (SHA-1's native digest length, so the truncation is a no-op
/// here but documented because the original states it explicitly).
pub fn derive_preldr_key(sb_key: &[u8; KEY_LEN], last16: &[u8; KEY_LEN]) -> [u8; 20] {
    let mut masked = [0u8; KEY_LEN];
    for i in 0..KEY_LEN {
        masked[i] = sb_key[i] ^ 0x5C;
    }
    let mut msg = Vec::with_capacity(KEY_LEN * 3);
    msg.extend_from_slice(sb_key);
    msg.extend_from_slice(last16);
    msg.extend_from_slice(&masked);
    sha1(&msg)
}

fn try_decrypt_bldr_with(block: &mut [u8], key: &[u8]) -> Result<(), BiosError> {
    rc4::symmetric_enc_dec(key, block).map_err(|e| BiosError::InvalidBldr(e.to_string()))
}

/// Loads and classifies a raw image buffer, deriving every pointer the
/// data model names and attempting 2BL/kernel decryption in the order
/// spec.md §4.6 prescribes: preldr-derived key, then an explicit
/// `keyBldr`, then the SB key from a supplied MCPX rev-0 image.
pub fn load(buf: Vec<u8>, params: &BiosParams) -> Result<BiosImage, BiosError> {
    validate_image_size(buf.len())?;
    let romsize = buf.len();
    let init_table = InitTable::parse(&buf[..INIT_TABLE_HEADER_LEN])?;

    let bldr_off = romsize - MCPX_SHADOW_LEN - BLDR_BLOCK_LEN;
    let bldr_block = buf[bldr_off..bldr_off + BLDR_BLOCK_LEN].to_vec();
    let has_preldr = PreldrParams::detect(&bldr_block).is_some();

    if has_preldr && params.mcpx_rev1.is_none() && params.key_bldr.is_none() {
        return Err(BiosError::InvalidArgs(
            "preldr detected but no MCPX rev-1 image or explicit bldr key supplied".into(),
        ));
    }

    let mut image = BiosImage {
        buf,
        romsize,
        init_table,
        has_preldr,
        bldr_decrypted: false,
        bldr_decrypt_source: None,
        loader_params: None,
        bldr_keys: None,
        boot_params: None,
        boot_params_valid: false,
        kernel_decrypted: false,
        kernel: None,
    };

    decrypt_bldr(&mut image, params)?;
    parse_bldr_layout(&mut image);
    decrypt_kernel(&mut image, params);

    Ok(image)
}

fn decrypt_bldr(image: &mut BiosImage, params: &BiosParams) -> Result<(), BiosError> {
    if let Some(mcpx1) = params.mcpx_rev1 {
        if image.has_preldr {
            let info = mcpx::identify(&mcpx1)?;
            if info.revision == McpxRevision::V1_1 {
                let sb_key_slice = mcpx::secret_boot_key(&mcpx1, info)?;
                let mut sb_key = [0u8; KEY_LEN];
                sb_key.copy_from_slice(sb_key_slice);

                let mut last16 = [0u8; KEY_LEN];
                last16.copy_from_slice(&image.bldr_block()[BLDR_BLOCK_LEN - KEY_LEN..]);

                let key = derive_preldr_key(&sb_key, &last16);
                let block = image.bldr_block_mut();
                try_decrypt_bldr_with(block, &key[..])?;
                image.bldr_decrypted = true;
                image.bldr_decrypt_source = Some(BldrDecryptSource::Preldr);
                reanchor_preldr(image);
                return Ok(());
            }
        }
    }

    if let Some(key) = params.key_bldr {
        let block = image.bldr_block_mut();
        try_decrypt_bldr_with(block, &key)?;
        image.bldr_decrypted = true;
        image.bldr_decrypt_source = Some(BldrDecryptSource::ExplicitKey);
        return Ok(());
    }

    if let Some(mcpx0) = params.mcpx_rev0 {
        let info = mcpx::identify(&mcpx0)?;
        let sb_key = mcpx::secret_boot_key(&mcpx0, info)?.to_vec();
        let block = image.bldr_block_mut();
        try_decrypt_bldr_with(block, &sb_key)?;
        image.bldr_decrypted = true;
        image.bldr_decrypt_source = Some(BldrDecryptSource::Mcpx0);
    }

    Ok(())
}

/// After the preldr's key decrypts the 2BL, the preldr itself rewrites
/// `ldrParams.bldrEntryPoint` from a field buried 8 bytes before the end of
/// its own 10752-byte region. We replicate that rewrite on our owned copy
/// rather than executing the preldr's own logic.
fn reanchor_preldr(image: &mut BiosImage) {
    let block_off = image.bldr_offset();
    let preldr_start_in_block = BLDR_BLOCK_LEN - PRELDR_LEN;
    let entry_field_off = block_off + preldr_start_in_block + PRELDR_LEN - 8;
    if entry_field_off + 4 > image.buf.len() {
        return;
    }
    let raw = u32::from_le_bytes([
        image.buf[entry_field_off],
        image.buf[entry_field_off + 1],
        image.buf[entry_field_off + 2],
        image.buf[entry_field_off + 3],
    ]);
    let new_entry = crate::bldr::BLDR_ENTRY_BASE.wrapping_add(raw);
    let lp_off = block_off;
    image.buf[lp_off..lp_off + 4].copy_from_slice(&new_entry.to_le_bytes());
}

/// Parses everything reachable from the 2BL block into `image`. Never
/// fails outright: a malformed loader-params/entry/keys chain or a boot
/// params record that fails signature or size validation just leaves the
/// corresponding field unset/invalid so `load` can still hand back a
/// usable image for callers to inspect.
fn parse_bldr_layout(image: &mut BiosImage) {
    let block = image.bldr_block().to_vec();

    let lp = LoaderParams::parse(&block[..LOADER_PARAMS_LEN]).ok();
    if let Some(lp) = &lp {
        let entry_field_off = LOADER_PARAMS_LEN;
        if entry_field_off + 8 <= block.len() {
            if let Ok(entry) = BldrEntry::parse(&block, entry_field_off) {
                if let Some(keys_off) = entry.keys_offset() {
                    if keys_off + BLDR_KEYS_LEN <= block.len() {
                        if let Ok(keys) = BldrKeys::parse(&block[keys_off..keys_off + BLDR_KEYS_LEN])
                        {
                            image.bldr_keys = Some(keys);
                        }
                    }
                }
            }
        }
    }
    image.loader_params = lp;

    let bp_off = image.boot_params_offset();
    if bp_off + BOOT_PARAMS_LEN <= block.len() {
        if let Ok(bp) = BootParams::parse(&block[bp_off..bp_off + BOOT_PARAMS_LEN]) {
            let sizes_ok = [bp.krnl_data_size, bp.inittbl_size, bp.compressed_kernel_size]
                .iter()
                .all(|&s| (s as usize) < image.romsize);
            // Size plausibility and signature validity are reported
            // independently -- a bad-signature-but-plausible-sizes bios
            // still parses, with `boot_params` populated either way.
            image.boot_params_valid = sizes_ok;
            image.boot_params = Some(bp);
        }
    }
}

fn decrypt_kernel(image: &mut BiosImage, params: &BiosParams) {
    let Some(bp) = image.boot_params.clone() else {
        return;
    };
    let comp_size = bp.compressed_kernel_size as usize;
    if comp_size == 0 || comp_size > image.romsize {
        return;
    }

    let kernel_end = image.bldr_offset();
    let Some(kernel_start) = kernel_end.checked_sub(comp_size) else {
        return;
    };

    let key: Option<Vec<u8>> = params
        .key_krnl
        .map(|k| k.to_vec())
        .or_else(|| {
            image.bldr_keys.as_ref().and_then(|bk| {
                let k = bk.kernel_key;
                let is_zero = k.iter().all(|&b| b == 0);
                let is_all_ff = k.iter().all(|&b| b == 0xFF);
                if is_zero || is_all_ff {
                    None
                } else {
                    Some(k.to_vec())
                }
            })
        });

    if let Some(key) = key {
        let slice = &mut image.buf[kernel_start..kernel_end];
        if rc4::symmetric_enc_dec(&key, slice).is_ok() {
            image.kernel_decrypted = true;
        }
    }

    let compressed = &image.buf[kernel_start..kernel_end];
    match xbios_lzx::decompress(compressed) {
        Ok(decompressed) => {
            log::debug!(
                "decompressed kernel: {} bytes -> {} bytes",
                compressed.len(),
                decompressed.len()
            );
            image.kernel = Some(decompressed);
        }
        Err(e) => {
            log::warn!("kernel decompression failed, leaving kernel buffer unset: {e}");
        }
    }
}

/// Decrypts the preldr's embedded public-key blob with TEA. Not invoked by
/// [`load`] by default -- see `BiosParams::decrypt_preldr_pubkey`.
pub fn decrypt_preldr_pubkey(blob: &mut [u32], key: &[u32; 4]) {
    for pair in blob.chunks_exact_mut(2) {
        let mut v = [pair[0], pair[1]];
        xbios_crypto::tea_decrypt(&mut v, key);
        pair[0] = v[0];
        pair[1] = v[1];
    }
}

/// Parts assembled into a fresh image by [`build`].
#[derive(Debug, Clone, Default)]
pub struct BiosParts {
    pub init_table_and_xcodes: Vec<u8>,
    pub bldr: Vec<u8>,
    pub compressed_kernel: Vec<u8>,
    pub kernel_data_tail: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct BuildParams {
    pub romsize: usize,
    pub key_bldr: Option<[u8; KEY_LEN]>,
    pub key_krnl: Option<[u8; KEY_LEN]>,
    pub flip_bfm: bool,
    pub hackinittbl: bool,
    pub hacksignature: bool,
    pub nobootparams: bool,
}

/// Assembles a fresh image from its constituent parts, matching the
/// original `Bios::save`'s layout writes. Encryption/BFM flip/hack flags
/// are each independently optional.
pub fn build(parts: &BiosParts, params: &BuildParams) -> Result<Vec<u8>, BiosError> {
    let romsize = if params.flip_bfm { 1024 * 1024 } else { params.romsize };
    validate_image_size(romsize)?;

    let mut buf = vec![0u8; romsize];

    let inittbl_len = parts.init_table_and_xcodes.len();
    if inittbl_len > romsize {
        return Err(BiosError::BufferOverflow("init table + xcodes exceed romsize".into()));
    }
    buf[..inittbl_len].copy_from_slice(&parts.init_table_and_xcodes);

    if params.hackinittbl && inittbl_len >= INIT_TABLE_HEADER_LEN {
        buf[2] = 0x00;
    }

    let bldr_off = romsize - MCPX_SHADOW_LEN - BLDR_BLOCK_LEN;
    if parts.bldr.len() != BLDR_BLOCK_LEN {
        return Err(BiosError::InvalidBldr(format!(
            "2bl part must be exactly {BLDR_BLOCK_LEN} bytes, got {}",
            parts.bldr.len()
        )));
    }
    buf[bldr_off..bldr_off + BLDR_BLOCK_LEN].copy_from_slice(&parts.bldr);

    let tail_len = parts.kernel_data_tail.len();
    let comp_len = parts.compressed_kernel.len();
    let tail_start = bldr_off
        .checked_sub(tail_len)
        .ok_or_else(|| BiosError::BufferOverflow("kernel data tail exceeds romsize".into()))?;
    buf[tail_start..tail_start + tail_len].copy_from_slice(&parts.kernel_data_tail);
    let comp_start = tail_start
        .checked_sub(comp_len)
        .ok_or_else(|| BiosError::BufferOverflow("compressed kernel exceeds romsize".into()))?;
    buf[comp_start..comp_start + comp_len].copy_from_slice(&parts.compressed_kernel);

    if !params.nobootparams {
        let digest = sha1(&parts.compressed_kernel);
        let mut bp = BootParams {
            krnl_data_size: tail_len as u32,
            inittbl_size: inittbl_len as u32,
            signature: crate::bldr::BOOT_PARAMS_SIGNATURE,
            signature_valid: true,
            compressed_kernel_size: comp_len as u32,
            digest,
        };
        if params.hacksignature {
            bp.signature ^= 0xFFFF_FFFF;
            bp.signature_valid = false;
        }
        let bp_off = bldr_off + BLDR_BLOCK_LEN - BOOT_PARAMS_LEN;
        buf[bp_off..bp_off + BOOT_PARAMS_LEN].copy_from_slice(&bp.serialize());
    }

    if let Some(key) = params.key_krnl {
        let slice = &mut buf[comp_start..comp_start + comp_len];
        rc4::symmetric_enc_dec(&key, slice).map_err(|e| BiosError::InvalidBldr(e.to_string()))?;
    }

    if let Some(key) = params.key_bldr {
        let slice = &mut buf[bldr_off..bldr_off + BLDR_BLOCK_LEN];
        rc4::symmetric_enc_dec(&key, slice).map_err(|e| BiosError::InvalidBldr(e.to_string()))?;
    }

    log::debug!("built bios image: {romsize} bytes, flip_bfm={}", params.flip_bfm);
    Ok(buf)
}

/// Duplicates a smaller image into the upper half(s) of a larger one.
/// `newSize` must be larger than the current size and one of the legal
/// image sizes; 256 KiB -> 1 MiB duplicates twice.
pub fn replicate(buf: &[u8], new_size: usize) -> Result<Vec<u8>, BiosError> {
    validate_image_size(buf.len())?;
    validate_image_size(new_size)?;
    if new_size <= buf.len() {
        return Err(BiosError::InvalidArgs(
            "replicate target size must exceed current image size".into(),
        ));
    }

    let factor = new_size / buf.len();
    if new_size % buf.len() != 0 {
        return Err(BiosError::InvalidArgs(
            "replicate target size must be an integer multiple of the current size".into(),
        ));
    }

    let mut out = Vec::with_capacity(new_size);
    for _ in 0..factor {
        out.extend_from_slice(buf);
    }
    Ok(out)
}

/// Slices an over-sized image into `imageSize / romsize` equally-sized
/// banks.
pub fn split(image_buf: &[u8], romsize: usize) -> Result<Vec<Vec<u8>>, BiosError> {
    validate_image_size(romsize)?;
    if image_buf.len() % romsize != 0 {
        return Err(BiosError::InvalidArgs(
            "image size is not an integer multiple of the requested bank size".into(),
        ));
    }
    let banks = image_buf.len() / romsize;
    if !(2..=4).contains(&banks) {
        return Err(BiosError::InvalidArgs(format!(
            "split produced {banks} banks, expected 2-4"
        )));
    }
    Ok(image_buf.chunks(romsize).map(|c| c.to_vec()).collect())
}

/// Concatenates 2-4 equally-sized banks into one image buffer.
pub fn combine(bank_bufs: &[Vec<u8>]) -> Result<Vec<u8>, BiosError> {
    if !(2..=4).contains(&bank_bufs.len()) {
        return Err(BiosError::InvalidArgs(format!(
            "combine expects 2-4 banks, got {}",
            bank_bufs.len()
        )));
    }
    let bank_len = bank_bufs[0].len();
    if !bank_bufs.iter().all(|b| b.len() == bank_len) {
        return Err(BiosError::InvalidArgs("all banks must be equally sized".into()));
    }

    let mut out = Vec::with_capacity(bank_len * bank_bufs.len());
    for bank in bank_bufs {
        out.extend_from_slice(bank);
    }
    validate_image_size(out.len())?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_image(romsize: usize, identifier: u8) -> Vec<u8> {
        let mut buf = vec![0u8; romsize];
        buf[2] = identifier;

        let bldr_off = romsize - MCPX_SHADOW_LEN - BLDR_BLOCK_LEN;
        let entry_point = crate::bldr::BLDR_ENTRY_BASE + 4;
        buf[bldr_off..bldr_off + 4].copy_from_slice(&entry_point.to_le_bytes());

        let bp = BootParams {
            krnl_data_size: 0,
            inittbl_size: 0,
            signature: crate::bldr::BOOT_PARAMS_SIGNATURE,
            signature_valid: true,
            compressed_kernel_size: 0,
            digest: [0u8; 20],
        };
        let bp_off = bldr_off + BLDR_BLOCK_LEN - BOOT_PARAMS_LEN;
        buf[bp_off..bp_off + BOOT_PARAMS_LEN].copy_from_slice(&bp.serialize());
        buf
    }

    #[test]
    fn load_rejects_bad_size() {
        let buf = vec![0u8; 1000];
        assert!(load(buf, &BiosParams::default()).is_err());
    }

    #[test]
    fn load_accepts_well_formed_fixture() {
        let buf = fixture_image(256 * 1024, 0x70);
        let image = load(buf, &BiosParams::default()).unwrap();
        assert!(image.boot_params_valid);
        assert!(!image.has_preldr);
    }

    #[test]
    fn derive_preldr_key_is_20_bytes() {
        let sb = [0x11u8; KEY_LEN];
        let last16 = [0x22u8; KEY_LEN];
        let k = derive_preldr_key(&sb, &last16);
        assert_eq!(k.len(), 20);
    }

    #[test]
    fn replicate_doubles_then_quadruples() {
        let buf = vec![0xAAu8; 256 * 1024];
        let doubled = replicate(&buf, 512 * 1024).unwrap();
        assert_eq!(doubled.len(), 512 * 1024);
        let quadrupled = replicate(&buf, 1024 * 1024).unwrap();
        assert_eq!(quadrupled.len(), 1024 * 1024);
    }

    #[test]
    fn replicate_rejects_shrinking() {
        let buf = vec![0u8; 1024 * 1024];
        assert!(replicate(&buf, 256 * 1024).is_err());
    }

    #[test]
    fn split_then_combine_round_trips() {
        let original = fixture_image(1024 * 1024, 0x70);
        let banks = split(&original, 256 * 1024).unwrap();
        assert_eq!(banks.len(), 4);
        let combined = combine(&banks).unwrap();
        assert_eq!(combined, original);
    }

    #[test]
    fn combine_rejects_mismatched_bank_sizes() {
        let banks = vec![vec![0u8; 256 * 1024], vec![0u8; 512 * 1024]];
        assert!(combine(&banks).is_err());
    }

    #[test]
    fn split_rejects_non_divisible_romsize() {
        let buf = vec![0u8; 256 * 1024];
        assert!(split(&buf, 512 * 1024).is_err());
    }
}
