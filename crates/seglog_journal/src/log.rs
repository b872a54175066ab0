//! The consensus log: a segmented journal plus commit bookkeeping.

use crate::config::{JournalConfig, StorageLevel};
use crate::error::JournalResult;
use crate::facade::Journal;
use crate::journal::{SegmentedJournal, SegmentedJournalReader, SegmentedJournalWriter};
use crate::segment::SegmentDescriptor;
use crate::types::ReaderMode;
use parking_lot::MutexGuard;
use seglog_codec::Codec;
use std::path::Path;

/// The durable log underneath a consensus module.
///
/// Wraps a [`SegmentedJournal`] and forwards to it; readers opened in
/// [`ReaderMode::Commits`] stop at [`commit_index`](Self::commit_index).
///
/// # Example
///
/// ```rust
/// use seglog_codec::BytesCodec;
/// use seglog_journal::{RaftLog, ReaderMode, StorageLevel};
///
/// let log: RaftLog<Vec<u8>, _> = RaftLog::builder()
///     .name("raft")
///     .storage_level(StorageLevel::Memory)
///     .build(BytesCodec)
///     .unwrap();
///
/// let mut writer = log.writer().unwrap();
/// writer.append(b"a".to_vec()).unwrap();
/// writer.append(b"b".to_vec()).unwrap();
/// writer.commit(1).unwrap();
/// drop(writer);
///
/// let committed: Vec<_> = log
///     .open_reader(1, ReaderMode::Commits)
///     .unwrap()
///     .map(|entry| entry.unwrap().index())
///     .collect();
/// assert_eq!(committed, vec![1]);
/// ```
#[derive(Debug)]
pub struct RaftLog<E, C> {
    journal: SegmentedJournal<E, C>,
}

impl RaftLog<(), ()> {
    /// Returns a builder with default settings.
    #[must_use]
    pub fn builder() -> RaftLogBuilder {
        RaftLogBuilder::default()
    }
}

impl<E: Clone, C: Codec<E>> RaftLog<E, C> {
    /// Opens the log described by `config`.
    ///
    /// # Errors
    ///
    /// See [`SegmentedJournal::open`].
    pub fn open(config: JournalConfig, codec: C) -> JournalResult<Self> {
        Ok(Self {
            journal: SegmentedJournal::open(config, codec)?,
        })
    }

    /// Returns the underlying journal.
    #[must_use]
    pub fn journal(&self) -> &SegmentedJournal<E, C> {
        &self.journal
    }

    /// Returns the highest committed index.
    #[must_use]
    pub fn commit_index(&self) -> u64 {
        self.journal.commit_index()
    }

    /// Returns true if commits sync the log.
    #[must_use]
    pub fn is_flush_on_commit(&self) -> bool {
        self.journal.config().flush_on_commit
    }

    /// See [`SegmentedJournal::writer`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::JournalError::NotOpen`] after close.
    pub fn writer(&self) -> JournalResult<MutexGuard<'_, SegmentedJournalWriter<E, C>>> {
        self.journal.writer()
    }

    /// See [`SegmentedJournal::open_reader`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::JournalError::NotOpen`] after close, or storage errors.
    pub fn open_reader(
        &self,
        index: u64,
        mode: ReaderMode,
    ) -> JournalResult<SegmentedJournalReader<E, C>> {
        self.journal.open_reader(index, mode)
    }

    /// See [`SegmentedJournal::compact`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::JournalError::NotOpen`] after close.
    pub fn compact(&self, index: u64) -> JournalResult<()> {
        self.journal.compact(index)
    }

    /// See [`SegmentedJournal::close`].
    ///
    /// # Errors
    ///
    /// Returns storage errors from the final flush.
    pub fn close(&self) -> JournalResult<()> {
        self.journal.close()
    }

    /// Returns true until the log is closed.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.journal.is_open()
    }

    /// Returns the descriptors of the live segments.
    #[must_use]
    pub fn segments(&self) -> Vec<SegmentDescriptor> {
        self.journal.segments()
    }
}

impl<E: Clone, C: Codec<E>> Journal<E> for RaftLog<E, C> {
    type Writer = SegmentedJournalWriter<E, C>;
    type Reader = SegmentedJournalReader<E, C>;

    fn writer(&self) -> JournalResult<MutexGuard<'_, Self::Writer>> {
        RaftLog::writer(self)
    }

    fn open_reader(&self, index: u64, mode: ReaderMode) -> JournalResult<Self::Reader> {
        RaftLog::open_reader(self, index, mode)
    }

    fn compact(&self, index: u64) -> JournalResult<()> {
        RaftLog::compact(self, index)
    }

    fn close(&self) -> JournalResult<()> {
        RaftLog::close(self)
    }

    fn is_open(&self) -> bool {
        RaftLog::is_open(self)
    }
}

/// Builds a [`RaftLog`].
#[derive(Debug, Clone, Default)]
pub struct RaftLogBuilder {
    config: JournalConfig,
}

impl RaftLogBuilder {
    /// Sets the log name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config = self.config.name(name);
        self
    }

    /// Sets the directory holding the segment files.
    #[must_use]
    pub fn directory(mut self, directory: impl AsRef<Path>) -> Self {
        self.config = self.config.directory(directory);
        self
    }

    /// Sets the storage level.
    #[must_use]
    pub fn storage_level(mut self, level: StorageLevel) -> Self {
        self.config = self.config.storage_level(level);
        self
    }

    /// Sets the maximum segment size.
    #[must_use]
    pub fn max_segment_size(mut self, size: u32) -> Self {
        self.config = self.config.max_segment_size(size);
        self
    }

    /// Sets the maximum entry size.
    #[must_use]
    pub fn max_entry_size(mut self, size: u32) -> Self {
        self.config = self.config.max_entry_size(size);
        self
    }

    /// Sets the sparse index density.
    #[must_use]
    pub fn index_density(mut self, density: f64) -> Self {
        self.config = self.config.index_density(density);
        self
    }

    /// Sets whether commits sync the log.
    #[must_use]
    pub fn flush_on_commit(mut self, value: bool) -> Self {
        self.config = self.config.flush_on_commit(value);
        self
    }

    /// Returns the configuration built so far.
    #[must_use]
    pub fn config(&self) -> &JournalConfig {
        &self.config
    }

    /// Opens the log.
    ///
    /// # Errors
    ///
    /// See [`SegmentedJournal::open`].
    pub fn build<E: Clone, C: Codec<E>>(self, codec: C) -> JournalResult<RaftLog<E, C>> {
        RaftLog::open(self.config, codec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::{JournalReader, JournalWriter};
    use crate::JournalError;
    use seglog_codec::BytesCodec;

    fn memory_log() -> RaftLog<Vec<u8>, BytesCodec> {
        RaftLog::builder()
            .name("raft")
            .storage_level(StorageLevel::Memory)
            .index_density(0.2)
            .build(BytesCodec)
            .unwrap()
    }

    #[test]
    fn builder_forwards_settings() {
        let builder = RaftLog::builder()
            .name("log")
            .max_segment_size(1024)
            .max_entry_size(64)
            .flush_on_commit(true);
        assert_eq!(builder.config().name, "log");
        assert_eq!(builder.config().max_segment_size, 1024);
        assert_eq!(builder.config().max_entry_size, 64);

        let log: RaftLog<Vec<u8>, _> = builder
            .storage_level(StorageLevel::Memory)
            .build(BytesCodec)
            .unwrap();
        assert!(log.is_flush_on_commit());
    }

    #[test]
    fn commit_bounds_commit_readers() {
        let log = memory_log();
        let mut reader = log.open_reader(1, ReaderMode::Commits).unwrap();
        {
            let mut writer = log.writer().unwrap();
            for i in 1..=3u8 {
                writer.append(vec![i]).unwrap();
            }
            assert!(!reader.has_next().unwrap());
            writer.commit(2).unwrap();
        }

        assert_eq!(log.commit_index(), 2);
        assert_eq!(reader.next().unwrap().unwrap().index(), 1);
        assert_eq!(reader.next().unwrap().unwrap().index(), 2);
        assert!(reader.next().is_none());
    }

    #[test]
    fn commit_index_never_moves_back() {
        let log = memory_log();
        let mut writer = log.writer().unwrap();
        writer.commit(5).unwrap();
        writer.commit(3).unwrap();
        assert_eq!(log.commit_index(), 5);
    }

    #[test]
    fn usable_through_facade() {
        fn append_all<J: Journal<Vec<u8>>>(journal: &J, count: u8) -> u64 {
            let mut writer = journal.writer().unwrap();
            for i in 0..count {
                writer.append(vec![i]).unwrap();
            }
            writer.last_index()
        }

        let log = memory_log();
        assert_eq!(append_all(&log, 4), 4);

        let mut reader = Journal::open_reader(&log, 3, ReaderMode::All).unwrap();
        assert_eq!(JournalReader::current_index(&reader), 2);
        assert_eq!(reader.next().unwrap().unwrap().entry(), &vec![2]);
    }

    #[test]
    fn closed_log_rejects_operations() {
        let log = memory_log();
        log.close().unwrap();
        log.close().unwrap();

        assert!(!log.is_open());
        assert!(matches!(log.writer(), Err(JournalError::NotOpen)));
        assert!(matches!(
            log.open_reader(1, ReaderMode::All),
            Err(JournalError::NotOpen)
        ));
        assert!(matches!(log.compact(1), Err(JournalError::NotOpen)));
    }
}
