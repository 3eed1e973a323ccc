//! Simplified LZX encoder. Unlike `lzx_encoder.c`'s optimal-parsing,
//! block-splitting compressor this performs a single greedy hash-chain
//! LZ77 parse per 32 KiB chunk, but it does choose among all three LZX
//! block types (VERBATIM, ALIGNED, UNCOMPRESSED) by building a candidate of
//! each and keeping the smallest, and always enables E8 call-offset
//! translation. It produces a stream this crate's [`crate::decoder`]
//! decodes bit-exactly -- matches never cross a chunk boundary, a scope
//! reduction documented in DESIGN.md.

use crate::bitstream::BitWriter;
use crate::e8;
use crate::error::LzxError;
use crate::huffman::{assign_canonical_codes, huffman_lengths};
use crate::tables::*;

const MAX_CHAIN: usize = 32;
const HASH_BITS: u32 = 15;
const HASH_SIZE: usize = 1 << HASH_BITS;

fn hash3(data: &[u8]) -> usize {
    let v = u32::from(data[0]) | (u32::from(data[1]) << 8) | (u32::from(data[2]) << 16);
    ((v.wrapping_mul(2654435761)) >> (32 - HASH_BITS)) as usize
}

enum Token {
    Literal(u8),
    Match { dist: u32, len: u32 },
}

fn parse_chunk(data: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut head = vec![-1i32; HASH_SIZE];
    let mut prev = vec![-1i32; data.len()];

    let mut i = 0usize;
    while i < data.len() {
        let mut best_len = 0usize;
        let mut best_dist = 0usize;

        if i + 3 <= data.len() {
            let h = hash3(&data[i..]);
            let mut cand = head[h];
            let mut chain = 0;
            while cand >= 0 && chain < MAX_CHAIN {
                let cp = cand as usize;
                let max_len = (data.len() - i).min(MAX_MATCH);
                let mut len = 0usize;
                while len < max_len && data[cp + len] == data[i + len] {
                    len += 1;
                }
                if len > best_len {
                    best_len = len;
                    best_dist = i - cp;
                }
                cand = prev[cp];
                chain += 1;
            }
        }

        if best_len >= 3 {
            tokens.push(Token::Match {
                dist: best_dist as u32,
                len: best_len as u32,
            });
            let end = i + best_len;
            while i < end {
                if i + 3 <= data.len() {
                    let h = hash3(&data[i..]);
                    prev[i] = head[h];
                    head[h] = i as i32;
                }
                i += 1;
            }
        } else {
            tokens.push(Token::Literal(data[i]));
            if i + 3 <= data.len() {
                let h = hash3(&data[i..]);
                prev[i] = head[h];
                head[h] = i as i32;
            }
            i += 1;
        }
    }

    tokens
}

/// Finds the position slot `m` (>= 3, a non-repeated-offset slot) and the
/// extra-bits value for a raw match distance, inverting the formula
/// `match_pos = v + MATCH_POS_MINUS2[m]` that [`crate::decoder`] decodes.
fn position_slot(dist: u32) -> (u32, u32) {
    let d = dist as i64;
    for m in (3..MATCH_POS_MINUS2.len()).rev() {
        if MATCH_POS_MINUS2[m] <= d {
            return (m as u32, (d - MATCH_POS_MINUS2[m]) as u32);
        }
    }
    (3, 0)
}

struct MainSymbol {
    symbol: u32,
    extra_bits: u32,
    extra_val: u32,
    len_symbol: Option<u32>,
}

struct LzxEncoder {
    last_matchpos_offset: [u32; NUM_REPEATED_OFFSETS],
    main_tree_prev_len: Vec<u8>,
    secondary_len_tree_prev_len: Vec<u8>,
    first_time_this_group: bool,
    main_elems: usize,
    instr_pos: u32,
    num_cfdata_frames: u32,
}

impl LzxEncoder {
    fn new() -> Self {
        let num_position_slots = num_position_slots_for_window(WINDOW_SIZE as u32);
        let main_elems = main_tree_elements(num_position_slots);
        LzxEncoder {
            last_matchpos_offset: [1, 1, 1],
            main_tree_prev_len: vec![0u8; main_elems],
            secondary_len_tree_prev_len: vec![0u8; NUM_SECONDARY_LEN],
            first_time_this_group: true,
            main_elems,
            instr_pos: 0,
            num_cfdata_frames: 0,
        }
    }

    fn resolve_match(&mut self, dist: u32, len: u32) -> MainSymbol {
        let total_len = len;
        let len_field_base = total_len - 2;
        let (len_field, len_symbol) = if len_field_base >= NUM_PRIMARY_LEN {
            (NUM_PRIMARY_LEN, Some(len_field_base - NUM_PRIMARY_LEN))
        } else {
            (len_field_base, None)
        };

        let repeat_slot = self
            .last_matchpos_offset
            .iter()
            .position(|&o| o == dist);

        let (m, extra_bits, extra_val) = if let Some(slot) = repeat_slot {
            if slot != 0 {
                let v = self.last_matchpos_offset[slot];
                self.last_matchpos_offset[slot] = self.last_matchpos_offset[0];
                self.last_matchpos_offset[0] = v;
            }
            (slot as u32, 0, 0)
        } else {
            let (m, v) = position_slot(dist);
            self.last_matchpos_offset[2] = self.last_matchpos_offset[1];
            self.last_matchpos_offset[1] = self.last_matchpos_offset[0];
            self.last_matchpos_offset[0] = dist;
            (m, u32::from(LZX_EXTRA_BITS[m as usize]), v)
        };

        MainSymbol {
            symbol: 256 + (m << 3) + len_field,
            extra_bits,
            extra_val,
            len_symbol,
        }
    }

    /// Writes a rep-tree-encoded length table using only the plain-delta
    /// codes (0-16), never the run-length codes 17/18/19 `read_rep_tree`
    /// also accepts -- simpler to generate, still valid input to it.
    fn write_rep_tree(
        w: &mut BitWriter,
        prev_len: &[u8],
        new_len: &[u8],
    ) -> Vec<u8> {
        let deltas: Vec<u8> = prev_len
            .iter()
            .zip(new_len.iter())
            .map(|(&p, &n)| ((i32::from(p) - i32::from(n) + 17) % 17) as u8)
            .collect();

        let mut freqs = [0u32; NUM_DECODE_SMALL];
        for &d in &deltas {
            freqs[d as usize] += 1;
        }
        let small_bitlen_vec = huffman_lengths(&freqs, 15);
        let mut small_bitlen = [0u8; NUM_DECODE_SMALL];
        small_bitlen.copy_from_slice(&small_bitlen_vec);
        let small_codes = assign_canonical_codes(&small_bitlen);

        for &len in &small_bitlen {
            w.put_bits(u32::from(len), 4);
        }
        for &d in &deltas {
            w.put_bits(
                u32::from(small_codes[d as usize]),
                u32::from(small_bitlen[d as usize]),
            );
        }

        new_len.to_vec()
    }

    /// Writes the one-time per-stream header, block-type-and-size header,
    /// and (for `ALIGNED`) the aligned-offset tree, followed by the two
    /// rep-tree-encoded Huffman tables and the symbol stream itself.
    #[allow(clippy::too_many_arguments)]
    fn write_tree_block(
        &self,
        w: &mut BitWriter,
        aligned: bool,
        write_header: bool,
        main_syms: &[MainSymbol],
        main_len: &[u8],
        main_codes: &[u16],
        len_tree_len: &[u8],
        len_codes: &[u16],
        aligned_len: &[u8; ALIGNED_NUM_ELEMENTS],
        aligned_codes: &[u16],
        original_block_size: u32,
    ) {
        if write_header {
            w.put_bits(1, 1);
            w.put_bits((DEFAULT_FILE_XLAT_SIZE >> 16) & 0xFFFF, 16);
            w.put_bits(DEFAULT_FILE_XLAT_SIZE & 0xFFFF, 16);
        }

        let block_type = if aligned { BLOCK_TYPE_ALIGNED } else { BLOCK_TYPE_VERBATIM };
        w.put_bits(block_type, 3);
        w.put_bits((original_block_size >> 16) & 0xFF, 8);
        w.put_bits((original_block_size >> 8) & 0xFF, 8);
        w.put_bits(original_block_size & 0xFF, 8);

        if aligned {
            for &len in aligned_len {
                w.put_bits(u32::from(len), 3);
            }
        }

        // matches read_main_and_secondary_trees's 3 independent rep-tree
        // reads: main[..256], main[256..], then the secondary length tree.
        Self::write_rep_tree(w, &self.main_tree_prev_len[..256], &main_len[..256]);
        Self::write_rep_tree(
            w,
            &self.main_tree_prev_len[256..self.main_elems],
            &main_len[256..self.main_elems],
        );
        Self::write_rep_tree(w, &self.secondary_len_tree_prev_len, len_tree_len);

        for s in main_syms {
            w.put_bits(u32::from(main_codes[s.symbol as usize]), u32::from(main_len[s.symbol as usize]));
            if aligned && s.extra_bits >= 3 {
                let hi_bits = s.extra_bits - 3;
                if hi_bits > 0 {
                    w.put_bits(s.extra_val >> 3, hi_bits);
                }
                let low3 = s.extra_val & 7;
                w.put_bits(u32::from(aligned_codes[low3 as usize]), u32::from(aligned_len[low3 as usize]));
            } else if s.extra_bits > 0 {
                w.put_bits(s.extra_val, s.extra_bits);
            }
            if let Some(ls) = s.len_symbol {
                w.put_bits(u32::from(len_codes[ls as usize]), u32::from(len_tree_len[ls as usize]));
            }
        }
    }

    /// Writes an `UNCOMPRESSED` block: header, the three repeated-offset
    /// registers as raw little-endian words, then `data` verbatim.
    fn write_uncompressed_block(&self, write_header: bool, original_block_size: u32, data: &[u8]) -> Vec<u8> {
        let mut w = BitWriter::new();
        if write_header {
            w.put_bits(1, 1);
            w.put_bits((DEFAULT_FILE_XLAT_SIZE >> 16) & 0xFFFF, 16);
            w.put_bits(DEFAULT_FILE_XLAT_SIZE & 0xFFFF, 16);
        }

        w.put_bits(BLOCK_TYPE_UNCOMPRESSED, 3);
        w.put_bits((original_block_size >> 16) & 0xFF, 8);
        w.put_bits((original_block_size >> 8) & 0xFF, 8);
        w.put_bits(original_block_size & 0xFF, 8);

        w.align_to_byte();
        for &offset in &self.last_matchpos_offset {
            w.write_raw(&offset.to_le_bytes());
        }
        w.write_raw(data);
        w.finish()
    }

    fn encode_chunk(&mut self, data: &[u8]) -> Result<Vec<u8>, LzxError> {
        let mut xlat = data.to_vec();
        if self.num_cfdata_frames < E8_CFDATA_FRAME_THRESHOLD {
            e8::untranslate_e8(&mut xlat, &mut self.instr_pos, DEFAULT_FILE_XLAT_SIZE);
        }
        self.num_cfdata_frames += 1;

        let tokens = parse_chunk(&xlat);

        let mut main_syms: Vec<MainSymbol> = Vec::with_capacity(tokens.len());
        for tok in &tokens {
            match *tok {
                Token::Literal(b) => main_syms.push(MainSymbol {
                    symbol: u32::from(b),
                    extra_bits: 0,
                    extra_val: 0,
                    len_symbol: None,
                }),
                Token::Match { dist, len } => main_syms.push(self.resolve_match(dist, len)),
            }
        }

        let mut main_freqs = vec![0u32; self.main_elems];
        let mut len_freqs = [0u32; NUM_SECONDARY_LEN];
        let mut aligned_freqs = [0u32; ALIGNED_NUM_ELEMENTS];
        for s in &main_syms {
            main_freqs[s.symbol as usize] += 1;
            if let Some(ls) = s.len_symbol {
                len_freqs[ls as usize] += 1;
            }
            if s.extra_bits >= 3 {
                aligned_freqs[(s.extra_val & 7) as usize] += 1;
            }
        }

        let main_len = huffman_lengths(&main_freqs, 15);
        let len_tree_len = huffman_lengths(&len_freqs, 15);
        let aligned_len_vec = huffman_lengths(&aligned_freqs, ALIGNED_TABLE_BITS);
        let mut aligned_len = [0u8; ALIGNED_NUM_ELEMENTS];
        aligned_len.copy_from_slice(&aligned_len_vec);

        let main_codes = assign_canonical_codes(&main_len);
        let len_codes = assign_canonical_codes(&len_tree_len);
        let aligned_codes = assign_canonical_codes(&aligned_len);

        let write_header = self.first_time_this_group;
        let original_block_size = xlat.len() as u32;

        let mut verbatim_w = BitWriter::new();
        self.write_tree_block(
            &mut verbatim_w,
            false,
            write_header,
            &main_syms,
            &main_len,
            &main_codes,
            &len_tree_len,
            &len_codes,
            &aligned_len,
            &aligned_codes,
            original_block_size,
        );
        let verbatim_bytes = verbatim_w.finish();

        let mut aligned_w = BitWriter::new();
        self.write_tree_block(
            &mut aligned_w,
            true,
            write_header,
            &main_syms,
            &main_len,
            &main_codes,
            &len_tree_len,
            &len_codes,
            &aligned_len,
            &aligned_codes,
            original_block_size,
        );
        let aligned_bytes = aligned_w.finish();

        let uncompressed_bytes = self.write_uncompressed_block(write_header, original_block_size, &xlat);

        // Pick whichever candidate serializes smallest; VERBATIM and
        // ALIGNED both transmit fresh Huffman tables, UNCOMPRESSED transmits
        // none (the decoder leaves main/secondary tree state untouched for
        // it), so tree rep-state only advances when one of the former wins.
        let mut chosen = verbatim_bytes;
        let mut transmits_trees = true;
        if aligned_bytes.len() < chosen.len() {
            chosen = aligned_bytes;
        }
        if uncompressed_bytes.len() < chosen.len() {
            chosen = uncompressed_bytes;
            transmits_trees = false;
        }

        if write_header {
            self.first_time_this_group = false;
        }
        if transmits_trees {
            self.main_tree_prev_len = main_len;
            self.secondary_len_tree_prev_len = len_tree_len;
        }

        Ok(chosen)
    }
}

/// Compresses `data` into a stream of `{compressedSize, uncompressedSize}`
/// chunk headers followed by payloads, matching the container format
/// [`crate::decoder::LzxDecoder::decompress`] expects.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, LzxError> {
    let mut encoder = LzxEncoder::new();
    let mut out = Vec::new();

    if data.is_empty() {
        return Ok(out);
    }

    for chunk in data.chunks(CHUNK_SIZE) {
        let compressed = encoder.encode_chunk(chunk)?;
        if compressed.len() > u16::MAX as usize || chunk.len() > u16::MAX as usize {
            return Err(LzxError::BufferOverflow);
        }
        log::trace!(
            "encoded lzx chunk: {} bytes -> {} compressed bytes",
            chunk.len(),
            compressed.len()
        );
        out.extend_from_slice(&(compressed.len() as u16).to_le_bytes());
        out.extend_from_slice(&(chunk.len() as u16).to_le_bytes());
        out.extend_from_slice(&compressed);
    }

    log::debug!("lzx stream compressed: {} bytes -> {} bytes", data.len(), out.len());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_slot_round_trips_small_distances() {
        for d in [1u32, 2, 3, 4, 10, 100, 5000, 70000] {
            let (m, v) = position_slot(d);
            let back = (v as i64 + MATCH_POS_MINUS2[m as usize]) as u32;
            assert_eq!(back, d);
        }
    }

    #[test]
    fn empty_input_compresses_to_empty_stream() {
        assert!(compress(&[]).unwrap().is_empty());
    }
}
