//! Core value types shared by writers and readers.

/// Identifier of a segment. Unique within a journal directory, never reused.
pub type SegmentId = u64;

/// An entry at a fixed position in the log.
///
/// `size` is the encoded payload length. Two `Indexed` values are equal when
/// their index and entry are equal, whatever their recorded sizes.
#[derive(Debug, Clone)]
pub struct Indexed<E> {
    index: u64,
    entry: E,
    size: u32,
}

impl<E> Indexed<E> {
    /// Creates an indexed entry.
    pub const fn new(index: u64, entry: E, size: u32) -> Self {
        Self { index, entry, size }
    }

    /// Returns the 1-based log index.
    #[must_use]
    pub const fn index(&self) -> u64 {
        self.index
    }

    /// Returns the entry.
    #[must_use]
    pub const fn entry(&self) -> &E {
        &self.entry
    }

    /// Returns the encoded payload size in bytes.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Consumes the wrapper and returns the entry.
    pub fn into_entry(self) -> E {
        self.entry
    }
}

impl<E: PartialEq> PartialEq for Indexed<E> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.entry == other.entry
    }
}

impl<E: Eq> Eq for Indexed<E> {}

/// Which entries a reader may observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReaderMode {
    /// Every appended entry, committed or not.
    #[default]
    All,
    /// Only entries at or below the journal's commit index.
    Commits,
}
