//! # seglog journal
//!
//! Segmented, append-only, checksummed log storage: the durable entry
//! store underneath a replicated state machine's consensus log.
//!
//! This crate provides:
//! - [`SegmentedJournal`] with one writer and any number of readers
//! - segment rollover, truncation, compaction and crash recovery
//! - [`RaftLog`], the consensus log specialisation with commit tracking
//! - [`LogStorage`] for lock files and segment cleanup in a log directory
//!
//! ## On-disk format
//!
//! Each segment file starts with a 64-byte [`SegmentDescriptor`] followed by
//! frames of `[length i32][crc32 u32][payload]`. On open, every frame is
//! checksummed; the first invalid frame ends the log and the last segment
//! is cut back to it.
//!
//! ## Example
//!
//! ```rust
//! use seglog_codec::BytesCodec;
//! use seglog_journal::{JournalConfig, ReaderMode, SegmentedJournal};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let config = JournalConfig::new().name("raft").directory(dir.path());
//! let journal = SegmentedJournal::<Vec<u8>, _>::open(config, BytesCodec).unwrap();
//!
//! {
//!     let mut writer = journal.writer().unwrap();
//!     writer.append(b"first".to_vec()).unwrap();
//!     writer.append(b"second".to_vec()).unwrap();
//!     writer.flush().unwrap();
//! }
//!
//! let entries: Vec<Vec<u8>> = journal
//!     .open_reader(1, ReaderMode::All)
//!     .unwrap()
//!     .map(|entry| entry.unwrap().into_entry())
//!     .collect();
//! assert_eq!(entries, vec![b"first".to_vec(), b"second".to_vec()]);
//! journal.close().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod facade;
mod journal;
mod log;
pub mod segment;
mod storage;
mod types;

pub use config::{
    JournalConfig, StorageLevel, DEFAULT_INDEX_DENSITY, DEFAULT_MAX_ENTRY_SIZE,
    DEFAULT_MAX_SEGMENT_SIZE,
};
pub use error::{JournalError, JournalResult};
pub use facade::{Journal, JournalReader, JournalWriter};
pub use journal::{SegmentedJournal, SegmentedJournalReader, SegmentedJournalWriter};
pub use log::{RaftLog, RaftLogBuilder};
pub use segment::{SegmentDescriptor, DESCRIPTOR_BYTES, FRAME_HEADER_BYTES};
pub use storage::{LogStorage, StorageStatistics};
pub use types::{Indexed, ReaderMode, SegmentId};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
