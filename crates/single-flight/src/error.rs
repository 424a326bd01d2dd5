//! Error types for single-flight

use thiserror::Error;

/// Reasons a string cannot be used as a guard key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidKey {
    #[error("guard key is empty")]
    Empty,

    #[error("guard key contains only whitespace")]
    Blank,

    #[error("guard key contains a control character at byte {index}")]
    ControlCharacter { index: usize },

    #[error("guard key is {len} bytes, limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("guard key part {position} is empty")]
    EmptyPart { position: usize },
}
