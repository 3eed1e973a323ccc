use thiserror::Error;

#[derive(Debug, Error)]
pub enum X86Error {
    #[error("requested visor ram size {0} overflows")]
    BufferOverflow(usize),
}
