//! Error types for KV client operations.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur at the KV engine boundary.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The engine rejected or failed an operation.
    #[error("engine error: {message}")]
    Engine {
        /// Description of the failure.
        message: String,
    },

    /// A log listener could not be registered.
    #[error("listener registration failed: {message}")]
    Listener {
        /// Description of the failure.
        message: String,
    },
}

impl ClientError {
    /// Creates an engine error.
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }

    /// Creates a listener registration error.
    pub fn listener(message: impl Into<String>) -> Self {
        Self::Listener {
            message: message.into(),
        }
    }
}
