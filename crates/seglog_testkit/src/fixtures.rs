//! Test fixtures and journal helpers.
//!
//! Provides convenience functions for setting up throwaway journals and
//! sizing segments so tests can force rollover at a known entry.

use seglog_codec::BytesCodec;
use seglog_journal::segment::segment_path;
use seglog_journal::{
    JournalConfig, ReaderMode, SegmentedJournal, StorageLevel, DESCRIPTOR_BYTES,
    FRAME_HEADER_BYTES,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Journal name used by every fixture.
pub const JOURNAL_NAME: &str = "test";

/// A journal of raw byte entries.
pub type BytesJournal = SegmentedJournal<Vec<u8>, BytesCodec>;

/// Returns the on-disk size of the frame holding a `payload_len` byte entry.
pub const fn frame_len(payload_len: usize) -> usize {
    FRAME_HEADER_BYTES + payload_len
}

/// Returns a segment size that holds exactly `entries` entries of
/// `payload_len` bytes each.
pub const fn segment_size_for(entries: usize, payload_len: usize) -> u32 {
    (DESCRIPTOR_BYTES + entries * frame_len(payload_len)) as u32
}

/// A test journal with automatic cleanup.
pub struct TempJournal {
    /// The journal instance.
    pub journal: BytesJournal,
    config: JournalConfig,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TempJournal {
    /// Creates a journal with default limits in a fresh temporary directory.
    pub fn new() -> Self {
        Self::with_config(|config| config)
    }

    /// Creates an on-disk journal, letting `configure` adjust the config.
    pub fn with_config(configure: impl FnOnce(JournalConfig) -> JournalConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = configure(
            JournalConfig::new()
                .name(JOURNAL_NAME)
                .directory(temp_dir.path()),
        );
        let journal =
            SegmentedJournal::open(config.clone(), BytesCodec).expect("Failed to open journal");

        Self {
            journal,
            config,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Creates an in-memory journal.
    pub fn memory(configure: impl FnOnce(JournalConfig) -> JournalConfig) -> Self {
        let config = configure(
            JournalConfig::new()
                .name(JOURNAL_NAME)
                .storage_level(StorageLevel::Memory),
        );
        let journal =
            SegmentedJournal::open(config.clone(), BytesCodec).expect("Failed to open journal");

        Self {
            journal,
            config,
            _temp_dir: None,
        }
    }

    /// Returns the journal directory if on disk, None if in memory.
    pub fn directory(&self) -> Option<&Path> {
        self._temp_dir.as_ref().map(TempDir::path)
    }

    /// Returns the configuration the journal was opened with.
    pub fn config(&self) -> &JournalConfig {
        &self.config
    }

    /// Returns the path of segment `id`.
    pub fn segment_file(&self, id: u64) -> PathBuf {
        let directory = self.directory().expect("Memory journals have no files");
        segment_path(directory, JOURNAL_NAME, id)
    }

    /// Appends every entry, returning the assigned indexes.
    pub fn append_all(&self, entries: impl IntoIterator<Item = Vec<u8>>) -> Vec<u64> {
        let mut writer = self.journal.writer().expect("Journal closed");
        entries
            .into_iter()
            .map(|entry| writer.append(entry).expect("Append failed").index())
            .collect()
    }

    /// Reads every entry from `index` to the end with a fresh reader.
    pub fn read_from(&self, index: u64) -> Vec<(u64, Vec<u8>)> {
        self.journal
            .open_reader(index, ReaderMode::All)
            .expect("Failed to open reader")
            .map(|entry| {
                let entry = entry.expect("Read failed");
                (entry.index(), entry.into_entry())
            })
            .collect()
    }

    /// Closes the journal cleanly and opens it again from its files.
    pub fn reopen(self) -> Self {
        self.journal.close().expect("Failed to close journal");
        self.recover()
    }

    /// Abandons the journal without flushing, as a process crash would,
    /// and recovers it from whatever reached the files.
    pub fn crash(self) -> Self {
        let Self {
            journal,
            config,
            _temp_dir,
        } = self;
        std::mem::forget(journal);
        Self::reload(config, _temp_dir)
    }

    fn recover(self) -> Self {
        let Self {
            journal,
            config,
            _temp_dir,
        } = self;
        drop(journal);
        Self::reload(config, _temp_dir)
    }

    fn reload(config: JournalConfig, temp_dir: Option<TempDir>) -> Self {
        assert!(temp_dir.is_some(), "Memory journals cannot be reopened");
        let journal =
            SegmentedJournal::open(config.clone(), BytesCodec).expect("Failed to reopen journal");
        Self {
            journal,
            config,
            _temp_dir: temp_dir,
        }
    }
}

impl Default for TempJournal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TempJournal {
    type Target = BytesJournal;

    fn deref(&self) -> &Self::Target {
        &self.journal
    }
}

/// Runs a test with a temporary on-disk journal.
pub fn with_temp_journal<F, R>(f: F) -> R
where
    F: FnOnce(&BytesJournal) -> R,
{
    let fixture = TempJournal::new();
    f(&fixture.journal)
}

/// Builds `count` distinct entries of `len` bytes, entry `i` filled with `i`.
pub fn numbered_entries(count: u8, len: usize) -> Vec<Vec<u8>> {
    (1..=count).map(|i| vec![i; len]).collect()
}
