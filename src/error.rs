//! Error kinds for the coder, context tree, capitalization codec, and archive I/O.

/// Errors surfaced anywhere in the library.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("input exhausted before the declared length was reached")]
    TruncatedInput,
    #[error("malformed archive header: {0}")]
    MalformedHeader(String),
    #[error("invalid coding model: {0}")]
    InvalidModel(String),
    #[error("round trip mismatch at byte {0}")]
    RoundTripMismatch(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
