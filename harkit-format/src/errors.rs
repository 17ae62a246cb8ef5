use thiserror::Error;

/// Structural problems found while decoding a HAR document. Any of these
/// aborts the whole decode.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("{0} is expected to be an object")]
    NotAnObject(&'static str),
    #[error("log.entries is expected to be an array")]
    EntriesNotArray,
    #[error("Casting to number results in NaN ({0})")]
    NotANumber(&'static str),
    #[error("{0} must be a valid date")]
    InvalidDate(&'static str),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
