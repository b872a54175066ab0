//! Sequential cursor over one segment.

use super::{SegmentPin, DESCRIPTOR_BYTES};
use crate::error::JournalResult;
use crate::types::Indexed;
use seglog_codec::Codec;
use std::sync::Arc;
use tracing::warn;

/// Reads a segment's entries in order, validating every frame.
///
/// An invalid frame ends the segment for this reader: the entry before it
/// is the last one returned.
pub struct SegmentReader<E, C> {
    segment: SegmentPin,
    codec: Arc<C>,
    position: u64,
    next_index: u64,
    current: Option<Indexed<E>>,
    next: Option<Indexed<E>>,
}

impl<E: Clone, C: Codec<E>> SegmentReader<E, C> {
    /// Creates a reader positioned before the segment's first entry.
    #[must_use]
    pub fn new(segment: SegmentPin, codec: Arc<C>) -> Self {
        let next_index = segment.index();
        Self {
            segment,
            codec,
            position: DESCRIPTOR_BYTES as u64,
            next_index,
            current: None,
            next: None,
        }
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

    /// Returns the index of the entry last returned, or `first_index() - 1`.
    #[must_use]
    pub fn current_index(&self) -> u64 {
        self.next_index - 1
    }

    /// Returns the entry last returned by [`next_entry`](Self::next_entry).
    #[must_use]
    pub fn current_entry(&self) -> Option<&Indexed<E>> {
        self.current.as_ref()
    }

    /// Returns the index the next read yields.
    #[must_use]
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Returns true if another valid entry follows.
    ///
    /// # Errors
    ///
    /// Returns storage or codec errors. Corrupt frames are not errors.
    pub fn has_next(&mut self) -> JournalResult<bool> {
        if self.next.is_none() {
            self.next = self.read_next()?;
        }
        Ok(self.next.is_some())
    }

    /// Returns the next entry, or `None` at the end of valid data.
    ///
    /// # Errors
    ///
    /// Returns storage or codec errors.
    pub fn next_entry(&mut self) -> JournalResult<Option<Indexed<E>>> {
        if !self.has_next()? {
            return Ok(None);
        }
        let entry = self.next.take();
        if let Some(entry) = &entry {
            self.next_index = entry.index() + 1;
            self.current = Some(entry.clone());
        }
        Ok(entry)
    }

    /// Moves back before the first entry.
    pub fn reset(&mut self) {
        self.position = DESCRIPTOR_BYTES as u64;
        self.next_index = self.segment.index();
        self.current = None;
        self.next = None;
    }

    /// Positions the reader so the next read yields `index`.
    ///
    /// Seeks to the nearest sampled offset at or below `index - 1` and scans
    /// forward, leaving entry `index - 1` as the current entry when this
    /// segment holds it.
    ///
    /// # Errors
    ///
    /// Returns storage or codec errors.
    pub fn reset_to(&mut self, index: u64) -> JournalResult<()> {
        self.reset();
        let target = index.saturating_sub(1);
        let floor = self.segment.sparse_index().read().lookup(target);
        if let Some(floor) = floor {
            if floor.index >= self.segment.index() {
                self.position = floor.position;
                self.next_index = floor.index;
            }
        }
        while self.next_index < index && self.next_entry()?.is_some() {}
        Ok(())
    }

    fn read_next(&mut self) -> JournalResult<Option<Indexed<E>>> {
        match self.segment.read_frame(self.position) {
            Ok(Some(frame)) => {
                let entry = self.codec.decode(&frame.payload)?;
                self.position = frame.end();
                Ok(Some(Indexed::new(
                    self.next_index,
                    entry,
                    frame.payload.len() as u32,
                )))
            }
            Ok(None) => Ok(None),
            Err(err) if err.is_corruption() => {
                warn!(
                    segment_id = self.segment.id(),
                    index = self.next_index,
                    error = %err,
                    "reader stopped at invalid frame"
                );
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

impl<E, C> std::fmt::Debug for SegmentReader<E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentReader")
            .field("segment", &self.segment.id())
            .field("position", &self.position)
            .field("next_index", &self.next_index)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::tests::memory_segment;
    use crate::segment::{Segment, SegmentWriter, FRAME_HEADER_BYTES};
    use seglog_codec::BytesCodec;

    type Reader = SegmentReader<Vec<u8>, BytesCodec>;

    fn filled(index: u64, count: u8) -> Arc<Segment> {
        let segment = memory_segment(1, index, 1 << 16);
        let mut writer: SegmentWriter<Vec<u8>, BytesCodec> =
            SegmentWriter::open(segment.pin(), Arc::new(BytesCodec), false).unwrap();
        for i in 1..=count {
            writer.append(vec![i; 4]).unwrap();
        }
        segment
    }

    fn reader(segment: &Arc<Segment>) -> Reader {
        SegmentReader::new(segment.pin(), Arc::new(BytesCodec))
    }

    #[test]
    fn reads_in_order() {
        let segment = filled(1, 5);
        let mut reader = reader(&segment);

        assert_eq!(reader.current_index(), 0);
        assert!(reader.current_entry().is_none());
        for i in 1..=5u8 {
            assert!(reader.has_next().unwrap());
            let entry = reader.next_entry().unwrap().unwrap();
            assert_eq!(entry.index(), u64::from(i));
            assert_eq!(entry.entry(), &vec![i; 4]);
            assert_eq!(reader.current_index(), u64::from(i));
        }
        assert!(!reader.has_next().unwrap());
        assert!(reader.next_entry().unwrap().is_none());
        assert_eq!(reader.next_index(), 6);
    }

    #[test]
    fn empty_segment_has_nothing() {
        let segment = memory_segment(1, 7, 4096);
        let mut reader = reader(&segment);
        assert_eq!(reader.first_index(), 7);
        assert_eq!(reader.current_index(), 6);
        assert!(!reader.has_next().unwrap());
    }

    #[test]
    fn sees_appends_after_reaching_end() {
        let segment = filled(1, 1);
        let mut reader = reader(&segment);
        reader.next_entry().unwrap();
        assert!(!reader.has_next().unwrap());

        let mut writer: SegmentWriter<Vec<u8>, BytesCodec> =
            SegmentWriter::open(segment.pin(), Arc::new(BytesCodec), false).unwrap();
        writer.append(vec![2]).unwrap();

        assert!(reader.has_next().unwrap());
        assert_eq!(reader.next_entry().unwrap().unwrap().index(), 2);
    }

    #[test]
    fn reset_to_uses_sparse_index() {
        let segment = filled(1, 20);
        let mut reader = reader(&segment);

        reader.reset_to(10).unwrap();
        assert_eq!(reader.next_index(), 10);
        assert_eq!(reader.current_index(), 9);
        assert_eq!(reader.current_entry().unwrap().entry(), &vec![9u8; 4]);
        assert_eq!(reader.next_entry().unwrap().unwrap().index(), 10);

        reader.reset_to(1).unwrap();
        assert_eq!(reader.current_index(), 0);
        assert!(reader.current_entry().is_none());
        assert_eq!(reader.next_entry().unwrap().unwrap().index(), 1);
    }

    #[test]
    fn reset_to_past_end_stops_at_end() {
        let segment = filled(1, 3);
        let mut reader = reader(&segment);
        reader.reset_to(50).unwrap();
        assert_eq!(reader.next_index(), 4);
        assert_eq!(reader.current_index(), 3);
    }

    #[test]
    fn reset_rewinds() {
        let segment = filled(1, 3);
        let mut reader = reader(&segment);
        while reader.next_entry().unwrap().is_some() {}

        reader.reset();
        assert_eq!(reader.next_index(), 1);
        assert!(reader.current_entry().is_none());
        assert_eq!(reader.next_entry().unwrap().unwrap().index(), 1);
    }

    #[test]
    fn corrupt_frame_ends_segment() {
        let segment = filled(1, 3);
        let third_payload = DESCRIPTOR_BYTES + 2 * (FRAME_HEADER_BYTES + 4) + FRAME_HEADER_BYTES;
        {
            let backend = segment.backend().read();
            let mut image = backend
                .read_at(0, backend.size().unwrap() as usize)
                .unwrap();
            drop(backend);
            image[third_payload] ^= 0xFF;
            let mut backend = segment.backend().write();
            backend.truncate(0).unwrap();
            backend.append(&image).unwrap();
        }

        let mut reader = reader(&segment);
        assert_eq!(reader.next_entry().unwrap().unwrap().index(), 1);
        assert_eq!(reader.next_entry().unwrap().unwrap().index(), 2);
        assert!(reader.next_entry().unwrap().is_none());
        assert_eq!(reader.current_entry().unwrap().entry(), &vec![2u8; 4]);
    }

    #[test]
    fn readers_are_independent() {
        let segment = filled(1, 5);
        let mut first = reader(&segment);
        let mut second = reader(&segment);

        first.next_entry().unwrap();
        first.next_entry().unwrap();
        second.reset_to(4).unwrap();

        assert_eq!(first.current_index(), 2);
        assert_eq!(second.current_index(), 3);
        first.next_entry().unwrap();
        assert_eq!(second.current_index(), 3);
        assert_eq!(segment.references(), 2);
    }
}
