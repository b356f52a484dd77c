use thiserror::Error;

/// Bitcoin chain operation errors.
#[derive(Debug, Error)]
pub enum BtcError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid extended key: {0}")]
    InvalidExtendedKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid raw transaction: {0}")]
    InvalidRawTransaction(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("fee overflow: {0}")]
    FeeOverflow(String),
}
