//! Journal configuration.

use crate::error::{JournalError, JournalResult};
use crate::segment::DESCRIPTOR_BYTES;
use std::path::{Path, PathBuf};

/// Default maximum size of one segment file.
pub const DEFAULT_MAX_SEGMENT_SIZE: u32 = 32 * 1024 * 1024;

/// Default maximum encoded size of one entry.
pub const DEFAULT_MAX_ENTRY_SIZE: u32 = 1024 * 1024;

/// Default fraction of entries recorded in each segment's sparse index.
pub const DEFAULT_INDEX_DENSITY: f64 = 0.005;

/// Where segment bytes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageLevel {
    /// One file per segment in the journal directory.
    #[default]
    Disk,
    /// In-process buffers. Nothing survives a restart.
    Memory,
}

/// Configuration for opening a segmented journal.
#[derive(Debug, Clone)]
pub struct JournalConfig {
    /// Journal name; segment files are called `<name>-<id>.log`.
    pub name: String,

    /// Directory holding the segment files.
    pub directory: PathBuf,

    /// Backend used for segments.
    pub storage_level: StorageLevel,

    /// Maximum size of a segment file, descriptor included.
    pub max_segment_size: u32,

    /// Maximum encoded size of one entry.
    pub max_entry_size: u32,

    /// Fraction of entries whose offsets are kept in the sparse index.
    pub index_density: f64,

    /// Whether `commit` also syncs the current segment.
    pub flush_on_commit: bool,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            name: "journal".to_string(),
            directory: PathBuf::from("."),
            storage_level: StorageLevel::Disk,
            max_segment_size: DEFAULT_MAX_SEGMENT_SIZE,
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
            index_density: DEFAULT_INDEX_DENSITY,
            flush_on_commit: false,
        }
    }
}

impl JournalConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the journal name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the segment directory.
    #[must_use]
    pub fn directory(mut self, directory: impl AsRef<Path>) -> Self {
        self.directory = directory.as_ref().to_path_buf();
        self
    }

    /// Sets the storage level.
    #[must_use]
    pub const fn storage_level(mut self, level: StorageLevel) -> Self {
        self.storage_level = level;
        self
    }

    /// Sets the maximum segment size.
    #[must_use]
    pub const fn max_segment_size(mut self, size: u32) -> Self {
        self.max_segment_size = size;
        self
    }

    /// Sets the maximum entry size.
    #[must_use]
    pub const fn max_entry_size(mut self, size: u32) -> Self {
        self.max_entry_size = size;
        self
    }

    /// Sets the sparse index density.
    #[must_use]
    pub const fn index_density(mut self, density: f64) -> Self {
        self.index_density = density;
        self
    }

    /// Sets whether commits sync the current segment.
    #[must_use]
    pub const fn flush_on_commit(mut self, value: bool) -> Self {
        self.flush_on_commit = value;
        self
    }

    /// Checks every setting.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::InvalidConfig`] naming the first bad setting.
    pub fn validate(&self) -> JournalResult<()> {
        if self.name.is_empty() {
            return Err(JournalError::invalid_config("journal name is empty"));
        }
        if self.name.contains(['/', '\\']) {
            return Err(JournalError::invalid_config(format!(
                "journal name {:?} contains a path separator",
                self.name
            )));
        }
        if self.max_segment_size as usize <= DESCRIPTOR_BYTES {
            return Err(JournalError::invalid_config(format!(
                "max segment size {} must be larger than the {DESCRIPTOR_BYTES} byte descriptor",
                self.max_segment_size
            )));
        }
        if self.max_entry_size == 0 {
            return Err(JournalError::invalid_config(
                "max entry size must be positive",
            ));
        }
        if !(self.index_density > 0.0 && self.index_density < 1.0) {
            return Err(JournalError::invalid_config(format!(
                "index density {} must be between 0 and 1 exclusive",
                self.index_density
            )));
        }
        Ok(())
    }
}
