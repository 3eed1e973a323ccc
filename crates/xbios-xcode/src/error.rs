use thiserror::Error;

#[derive(Debug, Error)]
pub enum XcodeError {
    #[error("xcode data error: {0}")]
    DataError(String),

    #[error("xcode settings file error: {0}")]
    InvalidSettings(String),

    #[error("i/o error: {0}")]
    IoError(#[from] std::io::Error),
}
