//! Storage directory management for a consensus log.
//!
//! ```text
//! <directory>/
//! ├─ .<prefix>.lock     # instance id of the owning process
//! ├─ <prefix>-1.log     # log segments
//! └─ <prefix>-2.log
//! ```

use crate::config::{
    JournalConfig, StorageLevel, DEFAULT_INDEX_DENSITY, DEFAULT_MAX_ENTRY_SIZE,
    DEFAULT_MAX_SEGMENT_SIZE,
};
use crate::error::JournalResult;
use crate::log::RaftLog;
use crate::segment::is_segment_file;
use fs2::FileExt;
use seglog_codec::Codec;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Free and total space of the volume holding a log directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStatistics {
    /// Bytes available to this process.
    pub usable_space: u64,
    /// Size of the volume in bytes.
    pub total_space: u64,
}

impl StorageStatistics {
    /// Returns the used fraction of the volume, in `[0, 1]`.
    #[must_use]
    pub fn usage_ratio(&self) -> f64 {
        if self.total_space == 0 {
            return 0.0;
        }
        let used = self.total_space.saturating_sub(self.usable_space);
        used as f64 / self.total_space as f64
    }
}

/// The directory a consensus log lives in.
///
/// Arbitrates ownership through a lock file, opens the log, and removes
/// its segments.
///
/// # Example
///
/// ```rust,no_run
/// use seglog_codec::BytesCodec;
/// use seglog_journal::LogStorage;
///
/// let storage = LogStorage::new("raft", "/var/lib/node-1");
/// assert!(storage.lock("node-1").unwrap());
/// let log = storage.open_log::<Vec<u8>, _>(BytesCodec).unwrap();
/// # drop(log);
/// ```
#[derive(Debug, Clone)]
pub struct LogStorage {
    prefix: String,
    directory: PathBuf,
    storage_level: StorageLevel,
    max_segment_size: u32,
    max_entry_size: u32,
    index_density: f64,
    flush_on_commit: bool,
}

impl LogStorage {
    /// Creates a storage for logs called `prefix` in `directory`.
    #[must_use]
    pub fn new(prefix: impl Into<String>, directory: impl AsRef<Path>) -> Self {
        Self {
            prefix: prefix.into(),
            directory: directory.as_ref().to_path_buf(),
            storage_level: StorageLevel::Disk,
            max_segment_size: DEFAULT_MAX_SEGMENT_SIZE,
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
            index_density: DEFAULT_INDEX_DENSITY,
            flush_on_commit: false,
        }
    }

    /// Sets the storage level of the log.
    #[must_use]
    pub const fn storage_level(mut self, level: StorageLevel) -> Self {
        self.storage_level = level;
        self
    }

    /// Sets the maximum segment size of the log.
    #[must_use]
    pub const fn max_segment_size(mut self, size: u32) -> Self {
        self.max_segment_size = size;
        self
    }

    /// Sets the maximum entry size of the log.
    #[must_use]
    pub const fn max_entry_size(mut self, size: u32) -> Self {
        self.max_entry_size = size;
        self
    }

    /// Sets the sparse index density of the log.
    #[must_use]
    pub const fn index_density(mut self, density: f64) -> Self {
        self.index_density = density;
        self
    }

    /// Sets whether commits sync the log.
    #[must_use]
    pub const fn flush_on_commit(mut self, value: bool) -> Self {
        self.flush_on_commit = value;
        self
    }

    /// Returns the file name prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the storage directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Returns the path of the lock file.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.directory.join(format!(".{}.lock", self.prefix))
    }

    /// Returns the journal configuration for this storage.
    #[must_use]
    pub fn journal_config(&self) -> JournalConfig {
        JournalConfig::new()
            .name(self.prefix.clone())
            .directory(&self.directory)
            .storage_level(self.storage_level)
            .max_segment_size(self.max_segment_size)
            .max_entry_size(self.max_entry_size)
            .index_density(self.index_density)
            .flush_on_commit(self.flush_on_commit)
    }

    /// Claims the directory for instance `id`.
    ///
    /// Writes `id` into the lock file when there is none, otherwise compares
    /// the stored id byte for byte. Returns true if the directory belongs
    /// to `id`.
    ///
    /// # Errors
    ///
    /// Returns I/O errors from the directory or the lock file.
    pub fn lock(&self, id: &str) -> JournalResult<bool> {
        fs::create_dir_all(&self.directory)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path())?;

        FileExt::lock_exclusive(&file)?;
        let owned = claim(&file, id.as_bytes());
        FileExt::unlock(&file)?;
        let owned = owned?;
        debug!(prefix = %self.prefix, id, owned, "checked storage lock");
        Ok(owned)
    }

    /// Removes the lock file.
    ///
    /// # Errors
    ///
    /// Returns I/O errors other than a missing lock file.
    pub fn unlock(&self) -> JournalResult<()> {
        match fs::remove_file(self.lock_path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Opens the log stored here.
    ///
    /// # Errors
    ///
    /// See [`crate::SegmentedJournal::open`].
    pub fn open_log<E: Clone, C: Codec<E>>(&self, codec: C) -> JournalResult<RaftLog<E, C>> {
        RaftLog::open(self.journal_config(), codec)
    }

    /// Deletes every segment file of the log. Other files are left alone.
    ///
    /// # Errors
    ///
    /// Returns I/O errors from listing or deleting.
    pub fn delete_log(&self) -> JournalResult<()> {
        if !self.directory.exists() {
            return Ok(());
        }
        for dir_entry in fs::read_dir(&self.directory)? {
            let dir_entry = dir_entry?;
            let file_name = dir_entry.file_name();
            let is_segment = file_name
                .to_str()
                .is_some_and(|name| is_segment_file(&self.prefix, name));
            if is_segment {
                fs::remove_file(dir_entry.path())?;
                debug!(path = %dir_entry.path().display(), "deleted log segment");
            }
        }
        Ok(())
    }

    /// Returns free and total space of the volume.
    ///
    /// # Errors
    ///
    /// Returns I/O errors if the directory cannot be queried.
    pub fn statistics(&self) -> JournalResult<StorageStatistics> {
        fs::create_dir_all(&self.directory)?;
        Ok(StorageStatistics {
            usable_space: fs2::available_space(&self.directory)?,
            total_space: fs2::total_space(&self.directory)?,
        })
    }
}

fn claim(mut file: &File, id: &[u8]) -> io::Result<bool> {
    let mut existing = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut existing)?;
    if existing.is_empty() {
        file.write_all(id)?;
        file.sync_all()?;
        return Ok(true);
    }
    Ok(existing == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReaderMode;
    use seglog_codec::BytesCodec;
    use tempfile::tempdir;

    #[test]
    fn first_lock_wins() {
        let dir = tempdir().unwrap();
        let storage = LogStorage::new("raft", dir.path());

        assert!(storage.lock("node-1").unwrap());
        assert!(storage.lock("node-1").unwrap());
        assert!(!storage.lock("node-2").unwrap());
        assert_eq!(fs::read(storage.lock_path()).unwrap(), b"node-1");
    }

    #[test]
    fn unlock_releases_directory() {
        let dir = tempdir().unwrap();
        let storage = LogStorage::new("raft", dir.path());

        assert!(storage.lock("node-1").unwrap());
        storage.unlock().unwrap();
        storage.unlock().unwrap();
        assert!(storage.lock("node-2").unwrap());
    }

    #[test]
    fn open_log_uses_prefix_for_segments() {
        let dir = tempdir().unwrap();
        let storage = LogStorage::new("raft", dir.path()).index_density(0.2);

        let log = storage.open_log::<Vec<u8>, _>(BytesCodec).unwrap();
        log.writer().unwrap().append(vec![1, 2, 3]).unwrap();
        log.close().unwrap();

        assert!(dir.path().join("raft-1.log").exists());
        let log = storage.open_log::<Vec<u8>, _>(BytesCodec).unwrap();
        let mut reader = log.open_reader(1, ReaderMode::All).unwrap();
        assert_eq!(reader.next().unwrap().unwrap().entry(), &vec![1, 2, 3]);
    }

    #[test]
    fn delete_log_removes_only_segments() {
        let dir = tempdir().unwrap();
        let storage = LogStorage::new("raft", dir.path());
        assert!(storage.lock("node-1").unwrap());
        fs::write(dir.path().join("raft-1.log"), b"x").unwrap();
        fs::write(dir.path().join("raft-2.log"), b"x").unwrap();
        fs::write(dir.path().join("other-1.log"), b"x").unwrap();
        fs::write(dir.path().join("raft.snapshot"), b"x").unwrap();

        storage.delete_log().unwrap();

        assert!(!dir.path().join("raft-1.log").exists());
        assert!(!dir.path().join("raft-2.log").exists());
        assert!(dir.path().join("other-1.log").exists());
        assert!(dir.path().join("raft.snapshot").exists());
        assert!(storage.lock_path().exists());
    }

    #[test]
    fn statistics_report_space() {
        let dir = tempdir().unwrap();
        let stats = LogStorage::new("raft", dir.path()).statistics().unwrap();

        assert!(stats.total_space > 0);
        assert!(stats.usable_space <= stats.total_space);
        let ratio = stats.usage_ratio();
        assert!((0.0..=1.0).contains(&ratio));
    }

    #[test]
    fn usage_ratio_of_empty_volume_is_zero() {
        let stats = StorageStatistics {
            usable_space: 0,
            total_space: 0,
        };
        assert_eq!(stats.usage_ratio(), 0.0);

        let stats = StorageStatistics {
            usable_space: 25,
            total_space: 100,
        };
        assert!((stats.usage_ratio() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn journal_config_carries_settings() {
        let config = LogStorage::new("raft", "/data")
            .storage_level(StorageLevel::Memory)
            .max_segment_size(4096)
            .max_entry_size(128)
            .flush_on_commit(true)
            .journal_config();

        assert_eq!(config.name, "raft");
        assert_eq!(config.directory, PathBuf::from("/data"));
        assert_eq!(config.storage_level, StorageLevel::Memory);
        assert_eq!(config.max_segment_size, 4096);
        assert_eq!(config.max_entry_size, 128);
        assert!(config.flush_on_commit);
    }
}
