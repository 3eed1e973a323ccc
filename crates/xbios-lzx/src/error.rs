use thiserror::Error;

/// Errors produced by the LZX codec.
#[derive(Debug, Error)]
pub enum LzxError {
    #[error("lzx stream truncated or malformed")]
    InvalidData,
    #[error("lzx output would exceed the chunk buffer")]
    BufferOverflow,
    #[error("lzx block type {0} is not one of verbatim/aligned/uncompressed")]
    InvalidBlockType(u32),
    #[error("lzx huffman table construction failed (over-subscribed code lengths)")]
    BadHuffmanTable,
}
