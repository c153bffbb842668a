//! Error types for the composition engine.
//!
//! The live-frame path never returns these: missing or degraded inputs fall
//! back to "cannot judge" defaults. Errors surface only at configuration
//! load, reference registration and metadata decoding.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur outside the per-frame evaluation path.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("EXIF decode failed: {0}")]
    Exif(String),

    #[error("Collaborator {provider} failed: {message}")]
    Collaborator { provider: String, message: String },

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create an input validation error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an EXIF decoding error.
    pub fn exif(message: impl Into<String>) -> Self {
        Self::Exif(message.into())
    }

    /// Create a collaborator failure error.
    pub fn collaborator(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Collaborator {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
