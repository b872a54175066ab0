//! Segment file naming.
//!
//! Segment files are called `<name>-<id>.log` and live directly in the
//! journal directory.

use crate::types::SegmentId;
use std::path::{Path, PathBuf};

/// Extension of segment files.
pub const SEGMENT_EXTENSION: &str = "log";

/// Returns the file name of segment `id` of journal `name`.
#[must_use]
pub fn segment_file_name(name: &str, id: SegmentId) -> String {
    format!("{name}-{id}.{SEGMENT_EXTENSION}")
}

/// Returns the path of segment `id` of journal `name` inside `directory`.
#[must_use]
pub fn segment_path(directory: &Path, name: &str, id: SegmentId) -> PathBuf {
    directory.join(segment_file_name(name, id))
}

/// Extracts the segment id from a file name belonging to journal `name`.
///
/// Returns `None` for any file that is not exactly `<name>-<digits>.log`.
#[must_use]
pub fn parse_segment_id(name: &str, file_name: &str) -> Option<SegmentId> {
    let id = file_name
        .strip_prefix(name)?
        .strip_prefix('-')?
        .strip_suffix(SEGMENT_EXTENSION)?
        .strip_suffix('.')?;
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    id.parse().ok()
}

/// Returns true if `file_name` is a segment file of journal `name`.
#[must_use]
pub fn is_segment_file(name: &str, file_name: &str) -> bool {
    parse_segment_id(name, file_name).is_some()
}
