//! Verify command implementation.

use super::{list_segment_files, load_segment, CliError};
use std::path::Path;

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Number of segment files checked.
    pub segments_checked: usize,
    /// Number of valid frames.
    pub valid_entries: u64,
    /// Number of segments with an invalid frame.
    pub corrupt_segments: usize,
    /// List of errors found.
    pub errors: Vec<String>,
}

impl VerifyResult {
    /// Returns true if no problem was found.
    pub fn is_ok(&self) -> bool {
        self.corrupt_segments == 0 && self.errors.is_empty()
    }
}

/// Runs the verify command.
pub fn run(path: &Path, name: &str, max_entry_size: u32) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying journal '{}' at {:?}", name, path);
    println!();

    let result = verify(path, name, max_entry_size)?;
    println!("  Segments checked: {}", result.segments_checked);
    println!("  Valid entries:    {}", result.valid_entries);
    println!("  Corrupt segments: {}", result.corrupt_segments);
    for error in &result.errors {
        println!("  ✗ {}", error);
    }

    println!();
    if result.is_ok() {
        println!("✓ Journal verification passed");
        Ok(())
    } else {
        println!("✗ Journal verification failed");
        Err(CliError::VerificationFailed {
            errors: result.errors.len(),
        }
        .into())
    }
}

/// Checks every segment of journal `name` for invalid frames and index gaps.
pub fn verify(
    path: &Path,
    name: &str,
    max_entry_size: u32,
) -> Result<VerifyResult, Box<dyn std::error::Error>> {
    let mut result = VerifyResult::default();
    let mut spans = Vec::new();

    for file in list_segment_files(path, name)? {
        result.segments_checked += 1;
        let segment = match load_segment(&file, max_entry_size) {
            Ok(segment) => segment,
            Err(err) => {
                result
                    .errors
                    .push(format!("{}: unreadable descriptor: {}", file.path.display(), err));
                continue;
            }
        };
        if segment.id() != file.id {
            result.errors.push(format!(
                "{}: descriptor id {} does not match file name",
                file.path.display(),
                segment.id()
            ));
        }

        let report = segment.scan(0)?;
        result.valid_entries += report.entries;
        if let Some(position) = report.corrupt_at {
            result.corrupt_segments += 1;
            result.errors.push(format!(
                "segment {}: invalid frame at offset {} after index {}",
                segment.id(),
                position,
                segment.index() + report.entries - 1
            ));
        }
        spans.push((segment.id(), segment.index(), report.entries));
    }

    spans.sort_by_key(|&(_, index, _)| index);
    for pair in spans.windows(2) {
        let (id, index, entries) = pair[0];
        let (next_id, next_index, _) = pair[1];
        let expected = index + entries;
        if next_index != expected {
            result.errors.push(format!(
                "segment {} ends before index {} but segment {} starts at {}",
                id, expected, next_id, next_index
            ));
        }
    }

    Ok(result)
}
