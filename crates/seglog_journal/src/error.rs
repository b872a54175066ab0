//! Error types for seglog journals.

use std::io;
use thiserror::Error;

/// Result type for journal operations.
pub type JournalResult<T> = Result<T, JournalError>;

/// Errors that can occur while reading or writing a journal.
#[derive(Debug, Error)]
pub enum JournalError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] seglog_storage::StorageError),

    /// Entry codec error.
    #[error("codec error: {0}")]
    Codec(#[from] seglog_codec::CodecError),

    /// I/O error outside a segment backend (directory listing, lock file).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Encoded entry is larger than the configured maximum.
    #[error("entry too large: {size} bytes exceeds the maximum of {max}")]
    EntryTooLarge {
        /// Encoded size of the rejected entry.
        size: usize,
        /// Configured maximum entry size.
        max: usize,
    },

    /// A replicated entry would leave a gap in the log.
    #[error("non-sequential index: expected {expected}, got {actual}")]
    NonSequentialIndex {
        /// The next index the writer accepts.
        expected: u64,
        /// The index that was supplied.
        actual: u64,
    },

    /// Frame does not fit into the remaining space of a segment.
    #[error(
        "segment {segment_id} is full: frame needs {required} bytes, {available} available"
    )]
    SegmentFull {
        /// Segment that ran out of space.
        segment_id: u64,
        /// Bytes needed for the frame.
        required: u64,
        /// Bytes left in the segment.
        available: u64,
    },

    /// A frame failed length or checksum validation.
    #[error("corrupt frame in segment {segment_id} at offset {position}: {message}")]
    Corruption {
        /// Segment holding the bad frame.
        segment_id: u64,
        /// Byte offset of the bad frame.
        position: u64,
        /// What was wrong with it.
        message: String,
    },

    /// The journal has been closed.
    #[error("journal is not open")]
    NotOpen,

    /// Configuration rejected at open time.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Which setting is wrong and why.
        message: String,
    },

    /// A segment header or directory entry is malformed.
    #[error("invalid format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },
}

impl JournalError {
    /// Creates a corruption error.
    pub fn corruption(segment_id: u64, position: u64, message: impl Into<String>) -> Self {
        Self::Corruption {
            segment_id,
            position,
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Returns true for errors that recovery and readers absorb as end of data.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Corruption { .. })
    }
}
