//! Crash and corruption helpers for segment files.
//!
//! These damage segment files the way torn writes and bit rot do, so tests
//! can check that recovery stops at the first bad frame and keeps
//! everything before it.
//!
//! ## Usage
//!
//! ```rust
//! use seglog_testkit::prelude::*;
//!
//! let fixture = TempJournal::new();
//! fixture.append_all(numbered_entries(3, 8));
//! let fixture = fixture.reopen();
//!
//! flip_payload_byte(&fixture.segment_file(1), 2);
//! let fixture = fixture.reopen();
//! assert_eq!(fixture.read_from(1).len(), 2);
//! ```

use seglog_journal::segment::parse_segment_id;
use seglog_journal::{DESCRIPTOR_BYTES, FRAME_HEADER_BYTES};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// Lists the segment files of journal `name` in `dir`, ordered by id.
pub fn segment_files(dir: &Path, name: &str) -> Vec<PathBuf> {
    let mut files: Vec<(u64, PathBuf)> = fs::read_dir(dir)
        .expect("Failed to read journal directory")
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let id = parse_segment_id(name, entry.file_name().to_str()?)?;
            Some((id, entry.path()))
        })
        .collect();
    files.sort();
    files.into_iter().map(|(_, path)| path).collect()
}

/// Returns the byte offset of every frame in a segment file, following the
/// length prefixes from the end of the descriptor.
///
/// Stops at the first length that runs past the end of the file.
pub fn frame_offsets(path: &Path) -> Vec<u64> {
    let bytes = fs::read(path).expect("Failed to read segment file");
    let mut offsets = Vec::new();
    let mut position = DESCRIPTOR_BYTES;

    while position + FRAME_HEADER_BYTES <= bytes.len() {
        let mut len = [0u8; 4];
        len.copy_from_slice(&bytes[position..position + 4]);
        let len = i32::from_le_bytes(len);
        if len < 0 {
            break;
        }
        let end = position + FRAME_HEADER_BYTES + len as usize;
        if end > bytes.len() {
            break;
        }
        offsets.push(position as u64);
        position = end;
    }
    offsets
}

/// XORs one byte of a file with `0xFF`.
pub fn flip_byte(path: &Path, offset: u64) {
    let mut bytes = fs::read(path).expect("Failed to read file");
    let byte = bytes
        .get_mut(offset as usize)
        .expect("Offset past end of file");
    *byte ^= 0xFF;
    fs::write(path, bytes).expect("Failed to write file");
}

/// Corrupts the first payload byte of the `frame`-th frame (0-based) and
/// returns the frame's offset.
pub fn flip_payload_byte(path: &Path, frame: usize) -> u64 {
    let offset = *frame_offsets(path)
        .get(frame)
        .expect("Segment has fewer frames");
    flip_byte(path, offset + FRAME_HEADER_BYTES as u64);
    offset
}

/// Removes the last `bytes` bytes of a file, as a torn write would.
pub fn chop_tail(path: &Path, bytes: u64) {
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .expect("Failed to open file");
    let len = file.metadata().expect("Failed to stat file").len();
    file.set_len(len.saturating_sub(bytes))
        .expect("Failed to truncate file");
}

/// Appends raw bytes after the last frame of a segment file.
pub fn append_garbage(path: &Path, garbage: &[u8]) {
    let mut bytes = fs::read(path).expect("Failed to read file");
    bytes.extend_from_slice(garbage);
    fs::write(path, bytes).expect("Failed to write file");
}

/// Returns the size of a file in bytes.
pub fn file_len(path: &Path) -> u64 {
    fs::metadata(path).expect("Failed to stat file").len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{numbered_entries, segment_size_for, TempJournal, JOURNAL_NAME};

    #[test]
    fn frame_offsets_follow_lengths() {
        let fixture = TempJournal::new();
        fixture.append_all(numbered_entries(3, 10));
        let fixture = fixture.reopen();

        let offsets = frame_offsets(&fixture.segment_file(1));
        assert_eq!(offsets, vec![64, 82, 100]);
    }

    #[test]
    fn segment_files_are_ordered() {
        let fixture = TempJournal::with_config(|c| c.max_segment_size(segment_size_for(1, 4)));
        fixture.append_all(numbered_entries(12, 4));
        let dir = fixture.directory().unwrap();
        fs::write(dir.join("unrelated.txt"), b"x").unwrap();

        let files = segment_files(dir, JOURNAL_NAME);
        assert_eq!(files.len(), 12);
        assert_eq!(files[1], fixture.segment_file(2));
        assert_eq!(files[11], fixture.segment_file(12));
    }

    #[test]
    fn chop_and_append_change_length() {
        let fixture = TempJournal::new();
        fixture.append_all(numbered_entries(2, 4));
        let fixture = fixture.reopen();
        let path = fixture.segment_file(1);

        chop_tail(&path, 5);
        assert_eq!(file_len(&path), 64 + 24 - 5);
        append_garbage(&path, &[1, 2, 3]);
        assert_eq!(file_len(&path), 64 + 24 - 2);
        assert_eq!(frame_offsets(&path), vec![64]);
    }
}
