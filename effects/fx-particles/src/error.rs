//! Error handling for the particle runtime

use thiserror::Error;

/// Errors that can occur while configuring or updating an effect
///
/// Running out of pool capacity is not an error; spawning reports exhaustion
/// through `Option` and spawn counts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FxError {
    /// A setting was rejected when it was assigned
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The effect was used before `initialize` was called
    #[error("Effect {0} has not been initialized")]
    NotInitialized(u64),

    /// The effect was used after it was torn down
    #[error("Effect {0} has been destroyed")]
    Destroyed(u64),

    /// A user supplied callback reported a failure
    #[error("Callback error: {0}")]
    Callback(String),
}

impl FxError {
    /// Build a callback error from anything displayable
    pub fn callback(message: impl std::fmt::Display) -> Self {
        Self::Callback(message.to_string())
    }

    /// Whether the error is a setup problem rather than a runtime failure
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration(_) | Self::NotInitialized(_) | Self::Destroyed(_)
        )
    }
}

/// Type alias for Results from particle runtime operations
pub type Result<T> = std::result::Result<T, FxError>;
