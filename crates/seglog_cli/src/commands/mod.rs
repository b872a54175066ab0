//! CLI command implementations.

pub mod dump;
pub mod inspect;
pub mod verify;

use seglog_journal::segment::{parse_segment_id, Segment, SparseIndex};
use seglog_journal::{SegmentId, DEFAULT_INDEX_DENSITY};
use seglog_storage::FileBackend;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by the CLI commands themselves.
#[derive(Debug, Error)]
pub enum CliError {
    /// The directory holds no segment files for the journal.
    #[error("no segments of journal '{name}' found in {path:?}")]
    NoJournal {
        /// Journal name.
        name: String,
        /// Directory searched.
        path: PathBuf,
    },

    /// `verify` found problems.
    #[error("verification failed with {errors} error(s)")]
    VerificationFailed {
        /// Number of problems found.
        errors: usize,
    },

    /// Unknown `--format` value.
    #[error("unsupported output format '{0}' (expected text or json)")]
    UnsupportedFormat(String),
}

/// A segment file found in the journal directory.
#[derive(Debug)]
pub struct SegmentFile {
    /// Id parsed from the file name.
    pub id: SegmentId,
    /// Full path of the file.
    pub path: PathBuf,
}

/// Lists the segment files of journal `name`, ordered by id.
pub fn list_segment_files(
    path: &Path,
    name: &str,
) -> Result<Vec<SegmentFile>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if let Some(id) = parse_segment_id(name, file_name) {
            files.push(SegmentFile {
                id,
                path: entry.path(),
            });
        }
    }
    if files.is_empty() {
        return Err(CliError::NoJournal {
            name: name.to_string(),
            path: path.to_path_buf(),
        }
        .into());
    }
    files.sort_by_key(|file| file.id);
    Ok(files)
}

/// Opens a segment file without scanning or repairing it.
pub fn load_segment(
    file: &SegmentFile,
    max_entry_size: u32,
) -> Result<Arc<Segment>, Box<dyn std::error::Error>> {
    let backend = FileBackend::open(&file.path)?;
    let segment = Segment::load(
        Box::new(backend),
        Some(file.path.clone()),
        SparseIndex::new(DEFAULT_INDEX_DENSITY),
        max_entry_size,
    )?;
    Ok(Arc::new(segment))
}

/// Checks an output format argument.
pub fn check_format(format: &str) -> Result<(), CliError> {
    match format {
        "text" | "json" => Ok(()),
        other => Err(CliError::UnsupportedFormat(other.to_string())),
    }
}

/// Renders up to `max` leading bytes as hex, marking elided bytes.
pub fn hex_prefix(bytes: &[u8], max: usize) -> String {
    let mut out: String = bytes
        .iter()
        .take(max)
        .map(|byte| format!("{byte:02x}"))
        .collect();
    if bytes.len() > max {
        out.push_str("..");
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use seglog_journal::{JournalConfig, SegmentedJournal};
    use seglog_codec::BytesCodec;
    use tempfile::{tempdir, TempDir};

    /// Writes `count` entries into a small-segment journal named `cli`.
    pub(crate) fn journal_with(count: u8) -> TempDir {
        let dir = tempdir().unwrap();
        let config = JournalConfig::new()
            .name("cli")
            .directory(dir.path())
            .max_segment_size(256);
        let journal = SegmentedJournal::<Vec<u8>, _>::open(config, BytesCodec).unwrap();
        {
            let mut writer = journal.writer().unwrap();
            for i in 0..count {
                writer.append(vec![i; 16]).unwrap();
            }
        }
        journal.close().unwrap();
        dir
    }

    #[test]
    fn lists_only_own_segments() {
        let dir = journal_with(20);
        std::fs::write(dir.path().join("other-1.log"), b"x").unwrap();
        std::fs::write(dir.path().join("cli-1.log.bak"), b"x").unwrap();

        let files = list_segment_files(dir.path(), "cli").unwrap();
        assert!(files.len() > 1);
        assert!(files.windows(2).all(|pair| pair[0].id < pair[1].id));
        assert!(files.iter().all(|file| file.path.extension().unwrap() == "log"));
    }

    #[test]
    fn missing_journal_is_reported() {
        let dir = tempdir().unwrap();
        let err = list_segment_files(dir.path(), "cli").unwrap_err();
        assert!(err.to_string().contains("no segments"));
    }

    #[test]
    fn hex_prefix_elides() {
        assert_eq!(hex_prefix(&[0xab, 0x01], 4), "ab01");
        assert_eq!(hex_prefix(&[1, 2, 3], 2), "0102..");
        assert_eq!(hex_prefix(&[], 2), "");
    }

    #[test]
    fn format_is_checked() {
        assert!(check_format("json").is_ok());
        assert!(matches!(
            check_format("yaml"),
            Err(CliError::UnsupportedFormat(_))
        ));
    }
}
