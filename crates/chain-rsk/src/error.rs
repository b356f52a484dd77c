use thiserror::Error;

/// Rootstock chain operation errors.
#[derive(Debug, Error)]
pub enum RskError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),

    #[error("unsupported chain: {0}")]
    UnsupportedChain(u64),
}
