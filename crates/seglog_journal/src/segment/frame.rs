//! Entry frames.
//!
//! Every entry is stored as
//!
//! ```text
//! ┌────────────┬────────────┬─────────────────┐
//! │ length i32 │ crc32 u32  │ payload[length] │
//! └────────────┴────────────┴─────────────────┘
//! ```
//!
//! little-endian, with the CRC-32 computed over the payload only. Frames
//! follow the descriptor back to back.

use crate::error::{JournalError, JournalResult};
use crate::types::SegmentId;
use seglog_storage::StorageBackend;

/// Size of the length and checksum fields in front of every payload.
pub const FRAME_HEADER_BYTES: usize = 8;

/// CRC-32 of a payload.
#[must_use]
pub fn checksum(payload: &[u8]) -> u32 {
    crc32fast::hash(payload)
}

/// Builds the on-disk frame for `payload`.
///
/// # Errors
///
/// Returns [`JournalError::EntryTooLarge`] if the payload length does not
/// fit the signed 32-bit length field.
pub fn encode_frame(payload: &[u8]) -> JournalResult<Vec<u8>> {
    let len = i32::try_from(payload.len()).map_err(|_| JournalError::EntryTooLarge {
        size: payload.len(),
        max: i32::MAX as usize,
    })?;

    let mut frame = Vec::with_capacity(FRAME_HEADER_BYTES + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&checksum(payload).to_le_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// A validated frame read back from a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Frame {
    /// Offset of the frame header.
    pub position: u64,
    /// The checksummed payload.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Total bytes the frame occupies, header included.
    pub fn size(&self) -> u64 {
        (FRAME_HEADER_BYTES + self.payload.len()) as u64
    }

    /// Offset just past the frame.
    pub fn end(&self) -> u64 {
        self.position + self.size()
    }
}

/// Reads and validates the frame at `position`.
///
/// Returns `Ok(None)` when `position` is at or past the end of the data.
/// A truncated header or payload, an impossible length, or a checksum
/// mismatch is reported as [`JournalError::Corruption`].
pub(crate) fn read_frame(
    backend: &dyn StorageBackend,
    segment_id: SegmentId,
    position: u64,
    max_entry_size: u32,
) -> JournalResult<Option<Frame>> {
    let size = backend.size()?;
    if position >= size {
        return Ok(None);
    }
    if size - position < FRAME_HEADER_BYTES as u64 {
        return Err(JournalError::corruption(
            segment_id,
            position,
            format!("torn frame header: {} bytes left", size - position),
        ));
    }

    let header = backend.read_at(position, FRAME_HEADER_BYTES)?;
    let len = i32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let stored = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

    if len < 0 || len as u64 > u64::from(max_entry_size) {
        return Err(JournalError::corruption(
            segment_id,
            position,
            format!("invalid frame length {len}"),
        ));
    }
    let len = len as usize;
    let payload_start = position + FRAME_HEADER_BYTES as u64;
    if size - payload_start < len as u64 {
        return Err(JournalError::corruption(
            segment_id,
            position,
            format!(
                "torn frame payload: {len} bytes declared, {} present",
                size - payload_start
            ),
        ));
    }

    let payload = backend.read_at(payload_start, len)?;
    let computed = checksum(&payload);
    if computed != stored {
        return Err(JournalError::corruption(
            segment_id,
            position,
            format!("checksum mismatch: stored {stored:08x}, computed {computed:08x}"),
        ));
    }

    Ok(Some(Frame { position, payload }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use seglog_storage::InMemoryBackend;

    fn backend_with(frames: &[&[u8]]) -> InMemoryBackend {
        let mut backend = InMemoryBackend::new();
        for payload in frames {
            backend.append(&encode_frame(payload).unwrap()).unwrap();
        }
        backend
    }

    #[test]
    fn frame_layout() {
        let frame = encode_frame(b"abc").unwrap();

        assert_eq!(frame.len(), FRAME_HEADER_BYTES + 3);
        assert_eq!(&frame[0..4], &3i32.to_le_bytes());
        assert_eq!(&frame[4..8], &checksum(b"abc").to_le_bytes());
        assert_eq!(&frame[8..], b"abc");
    }

    #[test]
    fn reads_consecutive_frames() {
        let backend = backend_with(&[b"first", b"second entry"]);

        let first = read_frame(&backend, 1, 0, 1024).unwrap().unwrap();
        assert_eq!(first.payload, b"first");
        assert_eq!(first.size(), 13);

        let second = read_frame(&backend, 1, first.end(), 1024).unwrap().unwrap();
        assert_eq!(second.payload, b"second entry");
        assert_eq!(second.position, 13);

        assert!(read_frame(&backend, 1, second.end(), 1024).unwrap().is_none());
    }

    #[test]
    fn empty_payload_round_trips() {
        let backend = backend_with(&[b"a", b"", b"c"]);

        let first = read_frame(&backend, 1, 0, 1024).unwrap().unwrap();
        let empty = read_frame(&backend, 1, first.end(), 1024).unwrap().unwrap();
        assert!(empty.payload.is_empty());
        assert_eq!(empty.size(), FRAME_HEADER_BYTES as u64);

        let last = read_frame(&backend, 1, empty.end(), 1024).unwrap().unwrap();
        assert_eq!(last.payload, b"c");
        assert!(read_frame(&backend, 1, last.end(), 1024).unwrap().is_none());
    }

    #[test]
    fn checksum_mismatch_is_corruption() {
        let backend = backend_with(&[b"payload"]);
        backend.corrupt_byte(FRAME_HEADER_BYTES as u64 + 2).unwrap();

        let err = read_frame(&backend, 7, 0, 1024).unwrap_err();
        assert!(matches!(
            err,
            JournalError::Corruption {
                segment_id: 7,
                position: 0,
                ..
            }
        ));
    }

    #[test]
    fn torn_tail_is_corruption() {
        let frame = encode_frame(b"payload").unwrap();

        let header_only = InMemoryBackend::with_data(frame[..5].to_vec());
        assert!(read_frame(&header_only, 1, 0, 1024)
            .unwrap_err()
            .is_corruption());

        let short_payload = InMemoryBackend::with_data(frame[..frame.len() - 1].to_vec());
        assert!(read_frame(&short_payload, 1, 0, 1024)
            .unwrap_err()
            .is_corruption());
    }

    #[test]
    fn impossible_lengths_are_corruption() {
        let mut negative = (-1i32).to_le_bytes().to_vec();
        negative.extend_from_slice(&[0u8; 12]);
        let negative = InMemoryBackend::with_data(negative);
        assert!(read_frame(&negative, 1, 0, 1024)
            .unwrap_err()
            .is_corruption());

        let backend = backend_with(&[&[0xAB; 100]]);
        assert!(read_frame(&backend, 1, 0, 99).unwrap_err().is_corruption());
        assert!(read_frame(&backend, 1, 0, 100).unwrap().is_some());
    }
}
