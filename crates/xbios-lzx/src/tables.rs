//! Constant tables, ported from `lzx_decoder.c`.

pub const WINDOW_SIZE: usize = 128 * 1024;
pub const CHUNK_SIZE: usize = 32 * 1024;
pub const MAX_GROWTH: usize = 6144;
pub const OUTPUT_SIZE: usize = CHUNK_SIZE + MAX_GROWTH;

pub const NUM_REPEATED_OFFSETS: usize = 3;

pub const MIN_MATCH: usize = 2;
pub const MAX_MATCH: usize = MIN_MATCH + 255;

pub const NUM_PRIMARY_LEN: u32 = 7;
pub const NUM_SECONDARY_LEN: usize = (MAX_MATCH - MIN_MATCH + 1) - NUM_PRIMARY_LEN as usize;

pub const ALIGNED_TABLE_BITS: u32 = 7;
pub const ALIGNED_NUM_ELEMENTS: usize = 8;

pub const MAIN_TREE_TABLE_BITS: u32 = 10;
pub const SECONDARY_LEN_TREE_TABLE_BITS: u32 = 8;
pub const MAX_MAIN_TREE_ELEMENTS: usize = 672;

pub const NUM_DECODE_SMALL: usize = 20;
pub const DS_TABLE_BITS: u32 = 8;

pub const TREE_ENC_REP_MIN: u32 = 4;
pub const TREE_ENC_REP_FIRST_EXTRA_BITS: u32 = 4;
pub const TREE_ENC_REP_SECOND_EXTRA_BITS: u32 = 5;
pub const TREE_ENC_REP_ZERO_FIRST: u32 = 16;
pub const TREE_ENC_REP_SAME_EXTRA_BITS: u32 = 1;

pub const E8_CFDATA_FRAME_THRESHOLD: u32 = 32768;

/// `current_file_size` written into the one-time per-group header when E8
/// translation is enabled. The encoder always turns translation on, so this
/// is a fixed constant rather than a measured input size.
pub const DEFAULT_FILE_XLAT_SIZE: u32 = 12_000_000;

pub const BLOCK_TYPE_INVALID: u32 = 0;
pub const BLOCK_TYPE_VERBATIM: u32 = 1;
pub const BLOCK_TYPE_ALIGNED: u32 = 2;
pub const BLOCK_TYPE_UNCOMPRESSED: u32 = 3;

/// Number of extra position bits per match-position slot.
pub const LZX_EXTRA_BITS: [u8; 51] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13, 14, 14, 15, 15, 16, 16, 17, 17, 17, 17, 17, 17, 17, 17, 17, 17, 17, 17, 17, 17, 17,
];

/// Base match position for each slot, biased by -2 (added back during decode).
pub const MATCH_POS_MINUS2: [i64; 51] = [
    0 - 2,
    1 - 2,
    2 - 2,
    3 - 2,
    4 - 2,
    6 - 2,
    8 - 2,
    12 - 2,
    16 - 2,
    24 - 2,
    32 - 2,
    48 - 2,
    64 - 2,
    96 - 2,
    128 - 2,
    192 - 2,
    256 - 2,
    384 - 2,
    512 - 2,
    768 - 2,
    1024 - 2,
    1536 - 2,
    2048 - 2,
    3072 - 2,
    4096 - 2,
    6144 - 2,
    8192 - 2,
    12288 - 2,
    16384 - 2,
    24576 - 2,
    32768 - 2,
    49152 - 2,
    65536 - 2,
    98304 - 2,
    131072 - 2,
    196608 - 2,
    262144 - 2,
    393216 - 2,
    524288 - 2,
    655360 - 2,
    786432 - 2,
    917504 - 2,
    1048576 - 2,
    1179648 - 2,
    1310720 - 2,
    1441792 - 2,
    1572864 - 2,
    1703936 - 2,
    1835008 - 2,
    1966080 - 2,
    2097152 - 2,
];

/// Number of main-tree elements for a given slot count: `256 + slots * 8`.
pub const fn main_tree_elements(num_position_slots: u32) -> usize {
    256 + (num_position_slots as usize) * 8
}

/// Computes `num_position_slots` for [`WINDOW_SIZE`], matching `decode_init`.
pub fn num_position_slots_for_window(window_size: u32) -> u32 {
    let mut pos_start: u32 = 4;
    let mut slots: u32 = 4;
    loop {
        pos_start += 1u32 << LZX_EXTRA_BITS[slots as usize];
        slots += 1;
        if pos_start >= window_size {
            break;
        }
    }
    slots
}
