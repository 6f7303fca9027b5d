//! Error types shared across Quincena crates.

use thiserror::Error;

/// Errors raised while building shared value types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommonError {
    /// Bounds with min greater than or equal to max
    #[error("invalid bounds: min {min} must be below max {max}")]
    InvalidBounds {
        /// Lower edge
        min: f32,
        /// Upper edge
        max: f32,
    },

    /// A numeric value outside its allowed range
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// What was wrong
        reason: String,
    },
}

/// Result type alias for common operations.
pub type CommonResult<T> = Result<T, CommonError>;
