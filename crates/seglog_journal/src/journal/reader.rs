//! The journal-level reader.

use super::JournalInner;
use crate::error::JournalResult;
use crate::segment::{Segment, SegmentReader};
use crate::types::{Indexed, ReaderMode};
use seglog_codec::Codec;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A cursor over the whole journal.
///
/// Each reader pins the segment it is in and moves to the next segment
/// when it reaches the end of the current one. Readers are independent of
/// each other and of the writer.
///
/// In [`ReaderMode::Commits`] the reader never passes the journal's commit
/// index. When the writer truncates below the reader's position, the
/// reader moves back to the truncation point on its next call.
pub struct SegmentedJournalReader<E, C> {
    inner: Arc<JournalInner>,
    codec: Arc<C>,
    mode: ReaderMode,
    reader: SegmentReader<E, C>,
    /// Last entry of the previous segment, until this segment yields one.
    carried: Option<Indexed<E>>,
    id: u64,
    reposition: Arc<AtomicU64>,
}

impl<E: Clone, C: Codec<E>> SegmentedJournalReader<E, C> {
    pub(crate) fn open(
        inner: Arc<JournalInner>,
        codec: Arc<C>,
        index: u64,
        mode: ReaderMode,
    ) -> JournalResult<Self> {
        let first = inner.first_segment()?;
        let reader = SegmentReader::new(first.pin(), Arc::clone(&codec));
        let (id, reposition) = inner.register_reader();
        let mut this = Self {
            inner,
            codec,
            mode,
            reader,
            carried: None,
            id,
            reposition,
        };
        this.seek(index)?;
        Ok(this)
    }

    /// Returns the reader mode.
    #[must_use]
    pub fn mode(&self) -> ReaderMode {
        self.mode
    }

    /// Returns the first index held by the journal.
    #[must_use]
    pub fn first_index(&self) -> u64 {
        self.inner
            .first_segment()
            .map_or(self.reader.first_index(), |segment| segment.index())
    }

    /// Returns the index of the entry last returned.
    #[must_use]
    pub fn current_index(&self) -> u64 {
        self.reader.current_index()
    }

    /// Returns the entry last returned, if any.
    #[must_use]
    pub fn current_entry(&self) -> Option<&Indexed<E>> {
        self.reader.current_entry().or(self.carried.as_ref())
    }

    /// Returns the index the next read yields.
    #[must_use]
    pub fn next_index(&self) -> u64 {
        self.reader.next_index()
    }

    /// Returns true if another entry is available to this reader.
    ///
    /// # Errors
    ///
    /// Returns storage or codec errors.
    pub fn has_next(&mut self) -> JournalResult<bool> {
        self.sync_position()?;
        if self.mode == ReaderMode::Commits && self.next_index() > self.inner.commit_index() {
            return Ok(false);
        }
        if self.reader.has_next()? {
            return Ok(true);
        }

        if let Some(next) = self.inner.get_next_segment(self.reader.first_index()) {
            if next.index() == self.next_index() {
                self.carried = self.reader.current_entry().cloned().or(self.carried.take());
                self.reader = SegmentReader::new(next.pin(), Arc::clone(&self.codec));
                return self.reader.has_next();
            }
        }
        Ok(false)
    }

    /// Returns the next entry, or `None` when the reader is caught up.
    ///
    /// # Errors
    ///
    /// Returns storage or codec errors.
    pub fn next_entry(&mut self) -> JournalResult<Option<Indexed<E>>> {
        if !self.has_next()? {
            return Ok(None);
        }
        self.reader.next_entry()
    }

    /// Moves back before the first entry of the journal.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal has no segments.
    pub fn reset(&mut self) -> JournalResult<()> {
        let first = self.inner.first_segment()?;
        self.switch_to(&first);
        self.reader.reset();
        self.carried = None;
        Ok(())
    }

    /// Positions the reader so that the next read yields `index`.
    ///
    /// # Errors
    ///
    /// Returns storage or codec errors.
    pub fn reset_to(&mut self, index: u64) -> JournalResult<()> {
        self.sync_position()?;
        if index < self.next_index() {
            self.seek(index)
        } else {
            while self.next_index() < index && self.next_entry()?.is_some() {}
            Ok(())
        }
    }

    /// Seeks through the segment holding `index - 1`.
    fn seek(&mut self, index: u64) -> JournalResult<()> {
        let segment = self.inner.get_segment(index.saturating_sub(1))?;
        self.switch_to(&segment);
        self.carried = None;
        self.reader.reset_to(index)
    }

    fn switch_to(&mut self, segment: &Arc<Segment>) {
        if !Arc::ptr_eq(self.reader.segment().segment(), segment) {
            self.reader = SegmentReader::new(segment.pin(), Arc::clone(&self.codec));
        }
    }

    /// Applies a pending truncation notice and recovers from a retired
    /// segment.
    fn sync_position(&mut self) -> JournalResult<()> {
        let pending = self.reposition.swap(u64::MAX, Ordering::AcqRel);
        if self.reader.segment().is_retired() {
            let target = pending.min(self.next_index());
            self.reset()?;
            if target > self.next_index() {
                self.seek(target)?;
            }
        } else if pending <= self.next_index() {
            self.seek(pending)?;
        }
        Ok(())
    }
}

impl<E: Clone, C: Codec<E>> Iterator for SegmentedJournalReader<E, C> {
    type Item = JournalResult<Indexed<E>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}

impl<E, C> Drop for SegmentedJournalReader<E, C> {
    fn drop(&mut self) {
        self.inner.unregister_reader(self.id);
    }
}

impl<E, C> std::fmt::Debug for SegmentedJournalReader<E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentedJournalReader")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("reader", &self.reader)
            .finish_non_exhaustive()
    }
}
