use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptorError {
    #[error("{what} search timed out after {budget:?}")]
    Timeout { what: &'static str, budget: Duration },

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("prime too small (bits={bits}, min_bits={min_bits})")]
    PrimeTooSmall { bits: usize, min_bits: usize },

    #[error("modular inverse not found")]
    ModularInverseNotFound,

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("message digest reduces to zero modulo q")]
    InvalidHash,

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("message has not been received yet")]
    NotReady,

    #[error("random generation failed")]
    RandomGenerationFailed,

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
}

impl CryptorError {
    /// True for errors caused by mathematically unsatisfiable caller input.
    pub fn is_invalid_parameters(&self) -> bool {
        matches!(
            self,
            CryptorError::InvalidRange(_)
                | CryptorError::InvalidParameters(_)
                | CryptorError::PrimeTooSmall { .. }
        )
    }
}
