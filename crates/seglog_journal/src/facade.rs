//! The generic journal interface.
//!
//! [`SegmentedJournal`](crate::SegmentedJournal) and
//! [`RaftLog`](crate::RaftLog) both implement these traits, so code that
//! only appends and replays entries can be written against the facade.

use crate::error::JournalResult;
use crate::journal::{SegmentedJournal, SegmentedJournalReader, SegmentedJournalWriter};
use crate::types::{Indexed, ReaderMode};
use parking_lot::MutexGuard;
use seglog_codec::Codec;

/// A journal of `E` entries.
pub trait Journal<E> {
    /// The writer type.
    type Writer: JournalWriter<E>;
    /// The reader type.
    type Reader: JournalReader<E>;

    /// Locks and returns the single writer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::JournalError::NotOpen`] after close.
    fn writer(&self) -> JournalResult<MutexGuard<'_, Self::Writer>>;

    /// Opens a reader whose first read yields `index`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::JournalError::NotOpen`] after close, or storage errors.
    fn open_reader(&self, index: u64, mode: ReaderMode) -> JournalResult<Self::Reader>;

    /// Drops segments that lie entirely below `index`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::JournalError::NotOpen`] after close.
    fn compact(&self, index: u64) -> JournalResult<()>;

    /// Flushes and closes the journal. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns storage errors from the final flush.
    fn close(&self) -> JournalResult<()>;

    /// Returns true until the journal is closed.
    fn is_open(&self) -> bool;
}

/// Appends to a journal.
pub trait JournalWriter<E> {
    /// Index of the last entry.
    fn last_index(&self) -> u64;

    /// The last entry written, if the current segment holds one.
    fn last_entry(&self) -> Option<&Indexed<E>>;

    /// Index the next append gets.
    fn next_index(&self) -> u64;

    /// Appends an entry at the next index.
    ///
    /// # Errors
    ///
    /// See [`SegmentedJournalWriter::append`].
    fn append(&mut self, entry: E) -> JournalResult<Indexed<E>>;

    /// Appends a replicated entry at its own index.
    ///
    /// # Errors
    ///
    /// See [`SegmentedJournalWriter::append_indexed`].
    fn append_indexed(&mut self, indexed: Indexed<E>) -> JournalResult<Indexed<E>>;

    /// Publishes a commit index.
    ///
    /// # Errors
    ///
    /// See [`SegmentedJournalWriter::commit`].
    fn commit(&mut self, index: u64) -> JournalResult<()>;

    /// Makes `index` the next index written.
    ///
    /// # Errors
    ///
    /// See [`SegmentedJournalWriter::reset`].
    fn reset(&mut self, index: u64) -> JournalResult<()>;

    /// Discards entries above `index`.
    ///
    /// # Errors
    ///
    /// See [`SegmentedJournalWriter::truncate`].
    fn truncate(&mut self, index: u64) -> JournalResult<()>;

    /// Durability barrier.
    ///
    /// # Errors
    ///
    /// See [`SegmentedJournalWriter::flush`].
    fn flush(&mut self) -> JournalResult<()>;
}

/// Reads a journal in index order.
pub trait JournalReader<E>: Iterator<Item = JournalResult<Indexed<E>>> {
    /// First index held by the journal.
    fn first_index(&self) -> u64;

    /// Index of the entry last returned.
    fn current_index(&self) -> u64;

    /// The entry last returned.
    fn current_entry(&self) -> Option<&Indexed<E>>;

    /// Index the next read yields.
    fn next_index(&self) -> u64;

    /// Returns true if another entry is available.
    ///
    /// # Errors
    ///
    /// Returns storage or codec errors.
    fn has_next(&mut self) -> JournalResult<bool>;

    /// Moves back to the start of the journal.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal has no segments.
    fn reset(&mut self) -> JournalResult<()>;

    /// Positions the reader so the next read yields `index`.
    ///
    /// # Errors
    ///
    /// Returns storage or codec errors.
    fn reset_to(&mut self, index: u64) -> JournalResult<()>;
}

impl<E: Clone, C: Codec<E>> Journal<E> for SegmentedJournal<E, C> {
    type Writer = SegmentedJournalWriter<E, C>;
    type Reader = SegmentedJournalReader<E, C>;

    fn writer(&self) -> JournalResult<MutexGuard<'_, Self::Writer>> {
        SegmentedJournal::writer(self)
    }

    fn open_reader(&self, index: u64, mode: ReaderMode) -> JournalResult<Self::Reader> {
        SegmentedJournal::open_reader(self, index, mode)
    }

    fn compact(&self, index: u64) -> JournalResult<()> {
        SegmentedJournal::compact(self, index)
    }

    fn close(&self) -> JournalResult<()> {
        SegmentedJournal::close(self)
    }

    fn is_open(&self) -> bool {
        SegmentedJournal::is_open(self)
    }
}

impl<E: Clone, C: Codec<E>> JournalWriter<E> for SegmentedJournalWriter<E, C> {
    fn last_index(&self) -> u64 {
        SegmentedJournalWriter::last_index(self)
    }

    fn last_entry(&self) -> Option<&Indexed<E>> {
        SegmentedJournalWriter::last_entry(self)
    }

    fn next_index(&self) -> u64 {
        SegmentedJournalWriter::next_index(self)
    }

    fn append(&mut self, entry: E) -> JournalResult<Indexed<E>> {
        SegmentedJournalWriter::append(self, entry)
    }

    fn append_indexed(&mut self, indexed: Indexed<E>) -> JournalResult<Indexed<E>> {
        SegmentedJournalWriter::append_indexed(self, indexed)
    }

    fn commit(&mut self, index: u64) -> JournalResult<()> {
        SegmentedJournalWriter::commit(self, index)
    }

    fn reset(&mut self, index: u64) -> JournalResult<()> {
        SegmentedJournalWriter::reset(self, index)
    }

    fn truncate(&mut self, index: u64) -> JournalResult<()> {
        SegmentedJournalWriter::truncate(self, index)
    }

    fn flush(&mut self) -> JournalResult<()> {
        SegmentedJournalWriter::flush(self)
    }
}

impl<E: Clone, C: Codec<E>> JournalReader<E> for SegmentedJournalReader<E, C> {
    fn first_index(&self) -> u64 {
        SegmentedJournalReader::first_index(self)
    }

    fn current_index(&self) -> u64 {
        SegmentedJournalReader::current_index(self)
    }

    fn current_entry(&self) -> Option<&Indexed<E>> {
        SegmentedJournalReader::current_entry(self)
    }

    fn next_index(&self) -> u64 {
        SegmentedJournalReader::next_index(self)
    }

    fn has_next(&mut self) -> JournalResult<bool> {
        SegmentedJournalReader::has_next(self)
    }

    fn reset(&mut self) -> JournalResult<()> {
        SegmentedJournalReader::reset(self)
    }

    fn reset_to(&mut self, index: u64) -> JournalResult<()> {
        SegmentedJournalReader::reset_to(self, index)
    }
}
