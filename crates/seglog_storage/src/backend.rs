//! Storage backend trait definition.

use crate::error::StorageResult;

/// The byte store behind one segment.
///
/// Implementations are opaque: they hand back exactly the bytes that were
/// appended and know nothing about descriptors or frames.
///
/// # Invariants
///
/// - `append` returns the offset the data landed at, which is always the
///   previous `size`
/// - `read_at` sees every byte appended so far, flushed or not
/// - after `truncate(n)`, `size() == n` and the next append lands at `n`
/// - implementations are `Send + Sync`; the journal shares one backend
///   between the writer and any number of readers
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::ReadPastEnd`] if the range is not fully
    /// inside the store, or an I/O error.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends `data` to the end of the store and returns its offset.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Pushes buffered bytes down to the operating system.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Returns the logical size of the store in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Flushes and then forces data and metadata to stable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Cuts the store down to `new_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::TruncateBeyondEnd`] if `new_size` is
    /// larger than the current size, or an I/O error.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;
}
