use thiserror::Error;

/// Errors raised while decoding a link-layer frame.
///
/// Decode failures never escape the dispatcher; they travel downstream inside
/// the decoded packet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("packet slice error: {0}")]
    Slice(String),
    #[error("frame too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
}
