use thiserror::Error;

/// Errors shared by the crypto primitives in this crate.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key must be between 1 and 256 bytes, got {0}")]
    InvalidKeyLength(usize),
}
