//! Inspect command implementation.

use super::{check_format, list_segment_files, load_segment};
use serde::Serialize;
use std::path::Path;

/// Journal inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Journal directory.
    pub path: String,
    /// Journal name.
    pub name: String,
    /// First index held by the journal.
    pub first_index: u64,
    /// Last index held by the journal, `first_index - 1` when empty.
    pub last_index: u64,
    /// Total bytes used across all segment files.
    pub total_size: u64,
    /// One entry per segment, ordered by start index.
    pub segments: Vec<SegmentStats>,
}

/// Statistics for a single segment.
#[derive(Debug, Serialize)]
pub struct SegmentStats {
    /// Segment id.
    pub id: u64,
    /// Index of the first entry.
    pub index: u64,
    /// Number of valid frames.
    pub entries: u64,
    /// Bytes used, descriptor included.
    pub size: u64,
    /// Maximum segment size from the descriptor.
    pub capacity: u32,
    /// Offset of the first invalid frame, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrupt_at: Option<u64>,
}

/// Runs the inspect command.
pub fn run(
    path: &Path,
    name: &str,
    max_entry_size: u32,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    check_format(format)?;
    let result = inspect(path, name, max_entry_size)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Collects segment statistics for journal `name` in `path`.
pub fn inspect(
    path: &Path,
    name: &str,
    max_entry_size: u32,
) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let mut segments = Vec::new();
    for file in list_segment_files(path, name)? {
        let segment = load_segment(&file, max_entry_size)?;
        let report = segment.scan(0)?;
        segments.push(SegmentStats {
            id: segment.id(),
            index: segment.index(),
            entries: report.entries,
            size: segment.size()?,
            capacity: segment.descriptor().max_segment_size(),
            corrupt_at: report.corrupt_at,
        });
    }
    segments.sort_by_key(|stats| stats.index);

    let first_index = segments.first().map_or(1, |stats| stats.index);
    let last_index = segments
        .last()
        .map_or(0, |stats| stats.index + stats.entries - 1);

    Ok(InspectResult {
        path: path.display().to_string(),
        name: name.to_string(),
        first_index,
        last_index,
        total_size: segments.iter().map(|stats| stats.size).sum(),
        segments,
    })
}

fn print_text_output(result: &InspectResult) {
    println!("Journal '{}' in {}", result.name, result.path);
    println!("  Indexes:    {}..={}", result.first_index, result.last_index);
    println!("  Total size: {} bytes", result.total_size);
    println!("  Segments:   {}", result.segments.len());
    println!();
    println!(
        "  {:>8} {:>12} {:>10} {:>12} {:>12}",
        "id", "index", "entries", "size", "capacity"
    );
    for stats in &result.segments {
        let marker = if stats.corrupt_at.is_some() { " !" } else { "" };
        println!(
            "  {:>8} {:>12} {:>10} {:>12} {:>12}{}",
            stats.id, stats.index, stats.entries, stats.size, stats.capacity, marker
        );
    }
}
