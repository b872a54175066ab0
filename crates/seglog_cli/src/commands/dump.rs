//! Dump command implementation.

use super::{check_format, hex_prefix, list_segment_files, load_segment};
use seglog_codec::BytesCodec;
use seglog_journal::segment::SegmentReader;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Payload bytes shown per entry.
const PREFIX_BYTES: usize = 16;

/// One journal entry for output.
#[derive(Debug, Serialize)]
pub struct EntryInfo {
    /// Entry index.
    pub index: u64,
    /// Segment holding the entry.
    pub segment_id: u64,
    /// Payload size in bytes.
    pub size: u32,
    /// Hex-encoded leading payload bytes.
    pub prefix: String,
}

/// Runs the dump command.
pub fn run(
    path: &Path,
    name: &str,
    max_entry_size: u32,
    from: u64,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    check_format(format)?;
    let entries = read_entries(path, name, max_entry_size, from, limit)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => {
            print_text_output(&entries);
        }
    }

    Ok(())
}

/// Reads entries starting at `from`, in index order, across segments.
pub fn read_entries(
    path: &Path,
    name: &str,
    max_entry_size: u32,
    from: u64,
    limit: Option<usize>,
) -> Result<Vec<EntryInfo>, Box<dyn std::error::Error>> {
    let mut segments = Vec::new();
    for file in list_segment_files(path, name)? {
        segments.push(load_segment(&file, max_entry_size)?);
    }
    segments.sort_by_key(|segment| segment.index());

    let limit = limit.unwrap_or(usize::MAX);
    let codec = Arc::new(BytesCodec);
    let mut entries = Vec::new();

    for (i, segment) in segments.iter().enumerate() {
        let next_start = segments.get(i + 1).map(|next| next.index());
        if next_start.is_some_and(|start| start <= from) {
            continue;
        }

        let mut reader = SegmentReader::<Vec<u8>, _>::new(segment.pin(), Arc::clone(&codec));
        if from > segment.index() {
            reader.reset_to(from)?;
        }
        while entries.len() < limit {
            let Some(entry) = reader.next_entry()? else {
                break;
            };
            entries.push(EntryInfo {
                index: entry.index(),
                segment_id: segment.id(),
                size: entry.size(),
                prefix: hex_prefix(entry.entry(), PREFIX_BYTES),
            });
        }
        if entries.len() >= limit {
            break;
        }
    }

    Ok(entries)
}

fn print_text_output(entries: &[EntryInfo]) {
    if entries.is_empty() {
        println!("No entries found");
        return;
    }

    println!("{:>12} {:>8} {:>10}  {}", "index", "segment", "size", "payload");
    for entry in entries {
        println!(
            "{:>12} {:>8} {:>10}  {}",
            entry.index, entry.segment_id, entry.size, entry.prefix
        );
    }
    println!();
    println!("Total: {} entries", entries.len());
}
