//! Error types for value encoding.

use thiserror::Error;

/// Result type for encoding operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding a value for storage.
///
/// Decoding never errors: malformed stored text decodes to `None` and the
/// caller substitutes its default.
#[derive(Debug, Error)]
pub enum CodecError {
    /// JSON serialization failed.
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// A custom codec rejected the value.
    #[error("encoding failed: {message}")]
    Encode {
        /// Description of the failure.
        message: String,
    },
}

impl CodecError {
    /// Creates an encoding error.
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }
}
