//! Error types for kvcell core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Engine boundary error.
    #[error("client error: {0}")]
    Client(#[from] kvcell_client::ClientError),

    /// Value encoding error.
    #[error("codec error: {0}")]
    Codec(#[from] kvcell_codec::CodecError),

    /// A cell for this key is already cached with a different value type.
    #[error("cell type mismatch for key {key}: a cell with a different value type is cached")]
    CellTypeMismatch {
        /// The fully-qualified cell key.
        key: String,
    },

    /// A generic cell was requested without a codec.
    #[error("no codec for key {key}: supply one via CellOptions::codec or use a typed accessor")]
    CodecRequired {
        /// The fully-qualified cell key.
        key: String,
    },
}
