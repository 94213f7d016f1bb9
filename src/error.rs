use crate::storage::StorageKind;
use thiserror::Error;

pub type BloomResult<T> = std::result::Result<T, BloomError>;

#[derive(Error, Debug)]
pub enum BloomError {
    #[error("Storage type mismatch: {left} vs {right}")]
    TypeMismatch {
        left: StorageKind,
        right: StorageKind,
    },

    #[error("Storage length mismatch: {left} bits vs {right} bits")]
    LengthMismatch { left: usize, right: usize },

    #[error("Filter parameters mismatch: {0}")]
    ParameterMismatch(String),

    #[error("Filter is at capacity ({capacity} items)")]
    CapacityExhausted { capacity: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BloomError {
    /// True for every error raised by union/intersection on incompatible
    /// operands.
    pub fn is_mismatch(&self) -> bool {
        matches!(
            self,
            BloomError::TypeMismatch { .. }
                | BloomError::LengthMismatch { .. }
                | BloomError::ParameterMismatch(_)
        )
    }
}
