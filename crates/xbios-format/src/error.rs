use thiserror::Error;

/// The BIOS container engine's error taxonomy (kinds, not exception
/// hierarchies): every component surfaces one of these upward, nothing is
/// retried at the core.
#[derive(Debug, Error)]
pub enum BiosError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("invalid image: size {size} is not one of 256 KiB/512 KiB/1 MiB, or a size field exceeds the buffer")]
    InvalidImage { size: usize },

    #[error("invalid bldr: {0}")]
    InvalidBldr(String),

    #[error("invalid mcpx: 512-byte blob does not match any known digest")]
    InvalidMcpx,

    #[error("lzx decompression failed: {0}")]
    DecompressFailed(#[from] xbios_lzx::LzxError),

    #[error("buffer overflow: {0}")]
    BufferOverflow(String),

    #[error("out of memory")]
    OutOfMemory,

    #[error("i/o error: {0}")]
    IoError(#[from] std::io::Error),
}
