//! File-based storage backend for segment files.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Appends smaller than this are held in memory until the next flush.
const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// A buffered, file-backed segment store.
///
/// Appends are collected in an in-memory write buffer and written to the
/// file when the buffer fills, on [`StorageBackend::flush`], or when a read
/// touches bytes that are still buffered. Nothing is durable until
/// [`StorageBackend::sync`] returns.
///
/// # Thread Safety
///
/// All state sits behind one mutex, so a writer and concurrent readers can
/// share the backend through a lock that hands out `&self` for reads.
///
/// # Example
///
/// ```no_run
/// use seglog_storage::{FileBackend, StorageBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::create(Path::new("journal-1.log")).unwrap();
/// backend.append(b"descriptor").unwrap();
/// backend.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    state: Mutex<FileState>,
}

#[derive(Debug)]
struct FileState {
    file: File,
    /// Bytes already handed to the file.
    written: u64,
    /// Bytes appended after `written`, not yet handed to the file.
    pending: Vec<u8>,
    buffer_size: usize,
}

impl FileState {
    fn size(&self) -> u64 {
        self.written + self.pending.len() as u64
    }

    fn drain(&mut self) -> StorageResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.file.seek(SeekFrom::Start(self.written))?;
        self.file.write_all(&self.pending)?;
        self.written += self.pending.len() as u64;
        self.pending.clear();
        Ok(())
    }
}

impl FileBackend {
    /// Opens an existing segment file, or creates an empty one.
    ///
    /// Existing contents are kept; the logical size is the file length.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Self::from_file(path, file)
    }

    /// Creates a new, empty segment file, discarding anything already at
    /// `path`. Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories or the file cannot be created.
    pub fn create(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Self::from_file(path, file)
    }

    fn from_file(path: &Path, file: File) -> StorageResult<Self> {
        let written = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(FileState {
                file,
                written,
                pending: Vec::new(),
                buffer_size: DEFAULT_BUFFER_SIZE,
            }),
        })
    }

    /// Sets how many bytes may sit in the write buffer before they are
    /// written through. Zero writes every append straight to the file.
    #[must_use]
    pub fn with_buffer_size(self, buffer_size: usize) -> Self {
        self.state.lock().buffer_size = buffer_size;
        self
    }

    /// Returns the path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of appended bytes not yet written to the file.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.state.lock().pending.len()
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let mut state = self.state.lock();
        let size = state.size();
        let end = offset.saturating_add(len as u64);
        if end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }
        if len == 0 {
            return Ok(Vec::new());
        }

        // Entirely inside the write buffer: serve from memory.
        if offset >= state.written {
            let start = (offset - state.written) as usize;
            return Ok(state.pending[start..start + len].to_vec());
        }

        if end > state.written {
            state.drain()?;
        }
        state.file.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; len];
        state.file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let state = self.state.get_mut();
        let offset = state.size();
        if data.is_empty() {
            return Ok(offset);
        }
        state.pending.extend_from_slice(data);
        if state.pending.len() >= state.buffer_size {
            state.drain()?;
        }
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        let state = self.state.get_mut();
        state.drain()?;
        state.file.flush()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.state.lock().size())
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.flush()?;
        self.state.get_mut().file.sync_all()?;
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let state = self.state.get_mut();
        let size = state.size();
        if new_size > size {
            return Err(StorageError::TruncateBeyondEnd {
                requested: new_size,
                size,
            });
        }

        if new_size >= state.written {
            state.pending.truncate((new_size - state.written) as usize);
            return Ok(());
        }

        state.pending.clear();
        state.file.set_len(new_size)?;
        state.file.sync_all()?;
        state.written = new_size;
        Ok(())
    }
}
