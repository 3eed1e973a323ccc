//! A from-scratch reimplementation of the LZX dialect used to compress the
//! original Xbox kernel image, ported from `lzx_decoder.c`/`lzx.h` (decode
//! side bit-exact; encode side a simplified greedy parser -- see
//! DESIGN.md).

mod bitstream;
mod decoder;
mod e8;
mod encoder;
mod error;
mod huffman;
mod tables;

pub use decoder::LzxDecoder;
pub use e8::{translate_e8, untranslate_e8};
pub use encoder::compress;
pub use error::LzxError;
pub use tables::{CHUNK_SIZE, MAX_MATCH, MIN_MATCH, WINDOW_SIZE};

/// Decompresses a full LZX stream (chunk-header-delimited, as produced by
/// [`compress`] or found after a kernel image's XCODE table).
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, LzxError> {
    LzxDecoder::decompress(data)
}
