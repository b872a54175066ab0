//! Benchmark utilities.

use rand::Rng;
use seglog_codec::BytesCodec;
use seglog_journal::{JournalConfig, SegmentedJournal, StorageLevel};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

/// Generate random entry data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate a batch of random entries.
pub fn random_entries(count: usize, size: usize) -> Vec<Vec<u8>> {
    (0..count).map(|_| random_data(size)).collect()
}

/// A small structured entry for codec benchmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchCommand {
    /// Proposal term.
    pub term: u64,
    /// Key written.
    pub key: String,
    /// Value written.
    pub value: Vec<u8>,
}

/// Generate commands with random values of `size` bytes.
pub fn random_commands(count: usize, size: usize) -> Vec<BenchCommand> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| BenchCommand {
            term: rng.gen_range(1..100),
            key: format!("key-{i}"),
            value: random_data(size),
        })
        .collect()
}

/// Opens a byte journal. Disk journals live in the returned directory.
pub fn open_journal(
    level: StorageLevel,
    max_segment_size: u32,
) -> (SegmentedJournal<Vec<u8>, BytesCodec>, Option<TempDir>) {
    let mut config = JournalConfig::new()
        .name("bench")
        .storage_level(level)
        .max_segment_size(max_segment_size);
    let temp_dir = match level {
        StorageLevel::Disk => {
            let dir = TempDir::new().expect("Failed to create temp directory");
            config = config.directory(dir.path());
            Some(dir)
        }
        StorageLevel::Memory => None,
    };
    let journal = SegmentedJournal::open(config, BytesCodec).expect("Failed to open journal");
    (journal, temp_dir)
}

/// Opens a journal and fills it with `count` entries of `size` bytes.
pub fn filled_journal(
    level: StorageLevel,
    count: usize,
    size: usize,
) -> (SegmentedJournal<Vec<u8>, BytesCodec>, Option<TempDir>) {
    let (journal, dir) = open_journal(level, 4 * 1024 * 1024);
    {
        let mut writer = journal.writer().expect("Journal closed");
        for entry in random_entries(count, size) {
            writer.append(entry).expect("Append failed");
        }
        writer.flush().expect("Flush failed");
    }
    (journal, dir)
}
