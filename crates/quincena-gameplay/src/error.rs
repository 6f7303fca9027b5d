//! Error type for gameplay operations.
//!
//! Errors never cross the frame boundary: the session logs them and skips
//! the failing entity for that tick.

use quincena_common::{CommonError, EntityId};
use thiserror::Error;

/// Errors raised by gameplay systems.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameplayError {
    /// Entity was deactivated or removed before the operation ran
    #[error("stale reference: entity {0} is no longer active")]
    StaleReference(EntityId),

    /// Entity exists but is in a state the operation cannot handle
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Bad tuning or archetype data
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<CommonError> for GameplayError {
    fn from(err: CommonError) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// Result type alias for gameplay operations.
pub type GameplayResult<T> = Result<T, GameplayError>;
