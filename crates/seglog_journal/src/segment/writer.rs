//! Appends frames to one segment.

use super::frame::encode_frame;
use super::{SegmentPin, DESCRIPTOR_BYTES, FRAME_HEADER_BYTES};
use crate::error::{JournalError, JournalResult};
use crate::types::Indexed;
use seglog_codec::Codec;
use std::sync::Arc;
use tracing::warn;

/// Sequential writer for a single segment.
///
/// The writer's position always equals the backend size: every frame is
/// appended whole, and `truncate`/`reset` cut the backend back to the
/// position they settle on.
pub struct SegmentWriter<E, C> {
    segment: SegmentPin,
    codec: Arc<C>,
    max_entry_size: u32,
    position: u64,
    last: Option<Indexed<E>>,
    flush_on_commit: bool,
}

impl<E: Clone, C: Codec<E>> SegmentWriter<E, C> {
    /// Opens a writer at the end of the valid frames of `segment`.
    ///
    /// Anything after the last valid frame is cut off.
    ///
    /// # Errors
    ///
    /// Returns storage or codec errors from the recovery scan.
    pub fn open(segment: SegmentPin, codec: Arc<C>, flush_on_commit: bool) -> JournalResult<Self> {
        segment.activate();
        let max_entry_size = segment.max_entry_size();
        let mut writer = Self {
            segment,
            codec,
            max_entry_size,
            position: DESCRIPTOR_BYTES as u64,
            last: None,
            flush_on_commit,
        };
        writer.reset(0)?;
        Ok(writer)
    }

    /// Returns the pinned segment.
    #[must_use]
    pub fn segment(&self) -> &SegmentPin {
        &self.segment
    }

    /// Returns the index of the segment's first entry.
    #[must_use]
    pub fn first_index(&self) -> u64 {
        self.segment.index()
    }

    /// Returns the index of the last entry, or `first_index() - 1` when the
    /// segment is empty.
    #[must_use]
    pub fn last_index(&self) -> u64 {
        self.last
            .as_ref()
            .map_or(self.first_index() - 1, Indexed::index)
    }

    /// Returns the index the next append gets.
    #[must_use]
    pub fn next_index(&self) -> u64 {
        self.last_index() + 1
    }

    /// Returns the last appended entry.
    #[must_use]
    pub fn last_entry(&self) -> Option<&Indexed<E>> {
        self.last.as_ref()
    }

    /// Returns the write offset.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns true if the segment holds no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.position <= DESCRIPTOR_BYTES as u64
    }

    /// Appends `entry` at [`next_index`](Self::next_index).
    ///
    /// # Errors
    ///
    /// - [`JournalError::EntryTooLarge`] if the encoding exceeds the maximum
    ///   entry size; nothing is written
    /// - [`JournalError::SegmentFull`] if the frame does not fit
    /// - storage or codec errors
    pub fn append(&mut self, entry: E) -> JournalResult<Indexed<E>> {
        let payload = self.encode(&entry)?;
        self.ensure_capacity(payload.len())?;
        self.write_frame(entry, &payload)
    }

    /// Appends a replicated entry at its own index.
    ///
    /// An index below [`next_index`](Self::next_index) first truncates the
    /// segment to `index - 1`, so the supplied entry replaces whatever was
    /// stored there.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::NonSequentialIndex`] if `indexed` would leave
    /// a gap or is 0, and otherwise the errors of [`append`](Self::append).
    pub fn append_indexed(&mut self, indexed: Indexed<E>) -> JournalResult<Indexed<E>> {
        let next = self.next_index();
        if indexed.index() == 0 || indexed.index() > next {
            return Err(JournalError::NonSequentialIndex {
                expected: next,
                actual: indexed.index(),
            });
        }
        if indexed.index() < next {
            self.truncate(indexed.index().saturating_sub(1))?;
        }
        self.append(indexed.into_entry())
    }

    /// Encodes an entry and checks it against the maximum entry size.
    pub(crate) fn encode(&self, entry: &E) -> JournalResult<Vec<u8>> {
        let payload = self.codec.encode_to_vec(entry)?;
        if payload.len() > self.max_entry_size as usize {
            return Err(JournalError::EntryTooLarge {
                size: payload.len(),
                max: self.max_entry_size as usize,
            });
        }
        Ok(payload)
    }

    /// Checks that a frame for a payload of `len` bytes fits.
    pub(crate) fn ensure_capacity(&self, len: usize) -> JournalResult<()> {
        let required = (FRAME_HEADER_BYTES + len) as u64;
        let capacity = u64::from(self.segment.descriptor().max_segment_size());
        let available = capacity.saturating_sub(self.position);
        if required > available {
            return Err(JournalError::SegmentFull {
                segment_id: self.segment.id(),
                required,
                available,
            });
        }
        Ok(())
    }

    /// Writes an already encoded and capacity-checked entry.
    pub(crate) fn write_frame(&mut self, entry: E, payload: &[u8]) -> JournalResult<Indexed<E>> {
        let index = self.next_index();
        let frame = encode_frame(payload)?;
        let position = self.segment.backend().write().append(&frame)?;
        self.segment.sparse_index().write().index(index, position);
        self.position = position + frame.len() as u64;

        let indexed = Indexed::new(index, entry, payload.len() as u32);
        self.last = Some(indexed.clone());
        Ok(indexed)
    }

    /// Discards every entry above `index`.
    ///
    /// # Errors
    ///
    /// Returns storage or codec errors.
    pub fn truncate(&mut self, index: u64) -> JournalResult<()> {
        if index >= self.last_index() {
            return Ok(());
        }

        self.last = None;
        self.segment.sparse_index().write().truncate(index);
        if index < self.first_index() {
            self.position = DESCRIPTOR_BYTES as u64;
            self.segment.backend().write().truncate(self.position)?;
            Ok(())
        } else {
            self.reset(index)
        }
    }

    /// Re-derives the last entry and write position by scanning from the
    /// start of the segment, up to entry `index` (`0` for no limit).
    ///
    /// The scan stops at the first invalid frame; everything after the
    /// settled position is cut off.
    ///
    /// # Errors
    ///
    /// Returns storage errors, or a codec error if the last valid frame
    /// does not decode.
    pub fn reset(&mut self, index: u64) -> JournalResult<()> {
        let report = self.segment.scan(index)?;
        self.position = report.end;
        self.last = match report.last {
            Some((last_index, payload)) => Some(Indexed::new(
                last_index,
                self.codec.decode(&payload)?,
                payload.len() as u32,
            )),
            None => None,
        };

        let mut backend = self.segment.backend().write();
        let size = backend.size()?;
        if size > self.position {
            if report.corrupt_at.is_some() {
                warn!(
                    segment_id = self.segment.id(),
                    position = self.position,
                    discarded = size - self.position,
                    "discarding invalid segment tail"
                );
            }
            backend.truncate(self.position)?;
        }
        Ok(())
    }

    /// Records a commit; syncs when flush-on-commit is set.
    ///
    /// # Errors
    ///
    /// Returns storage errors from the sync.
    pub fn commit(&mut self, _index: u64) -> JournalResult<()> {
        if self.flush_on_commit {
            self.flush()?;
        }
        Ok(())
    }
}

impl<E, C> SegmentWriter<E, C> {
    /// Syncs the segment to stable storage.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub fn flush(&mut self) -> JournalResult<()> {
        self.segment.backend().write().sync()?;
        Ok(())
    }
}

impl<E, C> std::fmt::Debug for SegmentWriter<E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentWriter")
            .field("segment", &self.segment.id())
            .field("position", &self.position)
            .field("last_index", &self.last.as_ref().map(Indexed::index))
            .finish_non_exhaustive()
    }
}
