//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The operating system reported a failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A read asked for bytes past the logical end of the store.
    #[error("read beyond end of storage: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current logical size.
        size: u64,
    },

    /// A truncate asked to grow the store.
    #[error("cannot truncate to {requested} bytes: store holds only {size}")]
    TruncateBeyondEnd {
        /// The requested new size.
        requested: u64,
        /// The current logical size.
        size: u64,
    },
}
