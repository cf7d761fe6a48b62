//! Error types surfaced by the event codec.
use thiserror::Error;

/// Reasons a payload for a known discriminant could not be parsed.
///
/// Unknown discriminants are not errors; they decode to `None`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("{variant}: payload has {actual} bytes, layout needs {expected}")]
    Truncated {
        variant: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{variant}: field {index} is not a left-padded address")]
    InvalidAddress { variant: &'static str, index: usize },

    #[error("{variant}: field {index} is not a boolean word")]
    InvalidBool { variant: &'static str, index: usize },

    #[error("{variant}: field {index} does not fit in 64 bits")]
    UintOverflow { variant: &'static str, index: usize },

    #[error("{variant}: parsed fields do not match the registered layout")]
    LayoutMismatch { variant: &'static str },
}
