//! The fixed-size header at the start of every segment.

use crate::error::{JournalError, JournalResult};
use crate::types::SegmentId;
use seglog_storage::StorageBackend;

/// Size of the encoded descriptor. Frames start at this offset.
pub const DESCRIPTOR_BYTES: usize = 64;

/// Identity and capacity of one segment.
///
/// Layout (little-endian), zero-padded to [`DESCRIPTOR_BYTES`]:
///
/// ```text
/// ┌─────────┬─────────┬──────────────────┬─────────┐
/// │ id (8)  │index (8)│max_segment_size 4│ padding │
/// └─────────┴─────────┴──────────────────┴─────────┘
/// ```
///
/// Written once when the segment is created and never rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentDescriptor {
    id: SegmentId,
    index: u64,
    max_segment_size: u32,
}

impl SegmentDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub const fn new(id: SegmentId, index: u64, max_segment_size: u32) -> Self {
        Self {
            id,
            index,
            max_segment_size,
        }
    }

    /// Returns the segment id.
    #[must_use]
    pub const fn id(&self) -> SegmentId {
        self.id
    }

    /// Returns the index of the first entry in the segment.
    #[must_use]
    pub const fn index(&self) -> u64 {
        self.index
    }

    /// Returns the segment capacity in bytes, descriptor included.
    #[must_use]
    pub const fn max_segment_size(&self) -> u32 {
        self.max_segment_size
    }

    /// Encodes the descriptor.
    #[must_use]
    pub fn encode(&self) -> [u8; DESCRIPTOR_BYTES] {
        let mut buf = [0u8; DESCRIPTOR_BYTES];
        buf[0..8].copy_from_slice(&self.id.to_le_bytes());
        buf[8..16].copy_from_slice(&self.index.to_le_bytes());
        buf[16..20].copy_from_slice(&self.max_segment_size.to_le_bytes());
        buf
    }

    /// Decodes a descriptor from the first [`DESCRIPTOR_BYTES`] of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::InvalidFormat`] if `bytes` is too short or the
    /// id or first index is zero.
    pub fn decode(bytes: &[u8]) -> JournalResult<Self> {
        if bytes.len() < DESCRIPTOR_BYTES {
            return Err(JournalError::invalid_format(format!(
                "segment descriptor needs {DESCRIPTOR_BYTES} bytes, got {}",
                bytes.len()
            )));
        }

        let mut id = [0u8; 8];
        id.copy_from_slice(&bytes[0..8]);
        let mut index = [0u8; 8];
        index.copy_from_slice(&bytes[8..16]);
        let mut max_segment_size = [0u8; 4];
        max_segment_size.copy_from_slice(&bytes[16..20]);

        let descriptor = Self {
            id: u64::from_le_bytes(id),
            index: u64::from_le_bytes(index),
            max_segment_size: u32::from_le_bytes(max_segment_size),
        };
        if descriptor.id == 0 || descriptor.index == 0 {
            return Err(JournalError::invalid_format(format!(
                "segment descriptor has id {} and first index {}; both must be positive",
                descriptor.id, descriptor.index
            )));
        }
        Ok(descriptor)
    }

    /// Reads the descriptor at offset 0 of a segment store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is shorter than a descriptor or the
    /// header is malformed.
    pub fn read_from(backend: &dyn StorageBackend) -> JournalResult<Self> {
        let bytes = backend.read_at(0, DESCRIPTOR_BYTES)?;
        Self::decode(&bytes)
    }
}
