//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while turning entries into bytes and back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The entry could not be encoded.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// The bytes do not describe an entry of the expected type.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// Decoding finished before the end of the frame payload.
    #[error("{remaining} trailing bytes after decoded entry")]
    TrailingBytes {
        /// Bytes left unread.
        remaining: usize,
    },
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }
}
