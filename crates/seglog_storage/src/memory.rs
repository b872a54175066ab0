//! In-memory storage backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;

/// A segment store that lives entirely in memory.
///
/// Backs journals opened with the memory storage level and most unit
/// tests. Nothing survives the process; `flush` and `sync` are no-ops.
///
/// # Example
///
/// ```rust
/// use seglog_storage::{InMemoryBackend, StorageBackend};
///
/// let mut backend = InMemoryBackend::new();
/// backend.append(b"0123").unwrap();
/// backend.truncate(2).unwrap();
/// assert_eq!(backend.snapshot(), b"01");
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: RwLock<Vec<u8>>,
}

impl InMemoryBackend {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with `data`, e.g. a hand-built segment
    /// image for recovery tests.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Returns a copy of the stored bytes.
    #[must_use]
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.read().clone()
    }

    /// Overwrites one byte in place. Test hook for simulating bit rot.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadPastEnd`] if `offset` is outside the store.
    pub fn corrupt_byte(&self, offset: u64) -> StorageResult<()> {
        let mut data = self.data.write();
        let size = data.len() as u64;
        let byte = data
            .get_mut(offset as usize)
            .ok_or(StorageError::ReadPastEnd {
                offset,
                len: 1,
                size,
            })?;
        *byte ^= 0xFF;
        Ok(())
    }
}

impl StorageBackend for InMemoryBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let data = self.data.read();
        let size = data.len() as u64;
        let end = offset.saturating_add(len as u64);
        if end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }
        Ok(data[offset as usize..end as usize].to_vec())
    }

    fn append(&mut self, bytes: &[u8]) -> StorageResult<u64> {
        let data = self.data.get_mut();
        let offset = data.len() as u64;
        data.extend_from_slice(bytes);
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let data = self.data.get_mut();
        let size = data.len() as u64;
        if new_size > size {
            return Err(StorageError::TruncateBeyondEnd {
                requested: new_size,
                size,
            });
        }
        data.truncate(new_size as usize);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn append_offsets_are_contiguous() {
        let mut backend = InMemoryBackend::new();

        assert_eq!(backend.append(b"hello").unwrap(), 0);
        assert_eq!(backend.append(b" world").unwrap(), 5);
        assert_eq!(backend.size().unwrap(), 11);
        assert_eq!(backend.read_at(6, 5).unwrap(), b"world");
    }

    #[test]
    fn read_past_end_fails() {
        let mut backend = InMemoryBackend::new();
        backend.append(b"hello").unwrap();

        assert!(matches!(
            backend.read_at(3, 10),
            Err(StorageError::ReadPastEnd { .. })
        ));
        assert!(backend.read_at(5, 0).unwrap().is_empty());
    }

    #[test]
    fn with_data_preloads() {
        let backend = InMemoryBackend::with_data(b"preloaded".to_vec());
        assert_eq!(backend.size().unwrap(), 9);
        assert_eq!(backend.snapshot(), b"preloaded");
    }

    #[test]
    fn truncate_then_append_reuses_offsets() {
        let mut backend = InMemoryBackend::new();
        backend.append(b"hello world").unwrap();

        backend.truncate(5).unwrap();
        assert_eq!(backend.append(b"!").unwrap(), 5);
        assert_eq!(backend.snapshot(), b"hello!");
        assert!(backend.truncate(100).is_err());
    }

    #[test]
    fn corrupt_byte_flips_bits() {
        let mut backend = InMemoryBackend::new();
        backend.append(&[0x00, 0x0F]).unwrap();

        backend.corrupt_byte(1).unwrap();
        assert_eq!(backend.snapshot(), vec![0x00, 0xF0]);
        assert!(backend.corrupt_byte(2).is_err());
    }

    proptest! {
        #[test]
        fn reads_return_what_was_appended(chunks in prop::collection::vec(
            prop::collection::vec(any::<u8>(), 0..64), 1..16)) {
            let mut backend = InMemoryBackend::new();
            let mut offsets = Vec::new();
            for chunk in &chunks {
                offsets.push(backend.append(chunk).unwrap());
            }
            for (chunk, offset) in chunks.iter().zip(offsets) {
                prop_assert_eq!(&backend.read_at(offset, chunk.len()).unwrap(), chunk);
            }
        }
    }
}
