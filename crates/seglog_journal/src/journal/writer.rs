//! The journal-level writer.

use super::JournalInner;
use crate::error::{JournalError, JournalResult};
use crate::segment::SegmentWriter;
use crate::types::Indexed;
use seglog_codec::Codec;
use std::sync::Arc;
use tracing::debug;

/// The single writer of a journal.
///
/// Always writes into the last segment, rolling over to a new segment when
/// the current one cannot take the next frame. Obtained through
/// [`SegmentedJournal::writer`](super::SegmentedJournal::writer), which
/// serializes all writer calls.
pub struct SegmentedJournalWriter<E, C> {
    inner: Arc<JournalInner>,
    codec: Arc<C>,
    current: SegmentWriter<E, C>,
}

impl<E: Clone, C: Codec<E>> SegmentedJournalWriter<E, C> {
    pub(crate) fn open(inner: Arc<JournalInner>, codec: Arc<C>) -> JournalResult<Self> {
        let last = inner.last_segment()?;
        let current = Self::segment_writer(&inner, &codec, &last)?;
        Ok(Self {
            inner,
            codec,
            current,
        })
    }

    fn segment_writer(
        inner: &JournalInner,
        codec: &Arc<C>,
        segment: &Arc<crate::segment::Segment>,
    ) -> JournalResult<SegmentWriter<E, C>> {
        SegmentWriter::open(segment.pin(), Arc::clone(codec), inner.config().flush_on_commit)
    }

    /// Returns the index of the last entry, or `next_index() - 1`.
    #[must_use]
    pub fn last_index(&self) -> u64 {
        self.current.last_index()
    }

    /// Returns the last entry written to the current segment.
    #[must_use]
    pub fn last_entry(&self) -> Option<&Indexed<E>> {
        self.current.last_entry()
    }

    /// Returns the index the next append gets.
    #[must_use]
    pub fn next_index(&self) -> u64 {
        self.current.next_index()
    }

    /// Appends `entry` at [`next_index`](Self::next_index).
    ///
    /// When the current segment is full the writer rolls over to a new
    /// segment and retries once.
    ///
    /// # Errors
    ///
    /// - [`JournalError::NotOpen`] after close
    /// - [`JournalError::EntryTooLarge`] if the encoding exceeds the maximum
    ///   entry size
    /// - [`JournalError::SegmentFull`] if the entry does not fit even into an
    ///   empty segment
    /// - storage or codec errors
    pub fn append(&mut self, entry: E) -> JournalResult<Indexed<E>> {
        self.inner.ensure_open()?;
        let payload = self.current.encode(&entry)?;
        if let Err(err) = self.current.ensure_capacity(payload.len()) {
            if self.current.is_empty() {
                return Err(err);
            }
            self.roll_over()?;
            self.current.ensure_capacity(payload.len())?;
        }
        self.current.write_frame(entry, &payload)
    }

    /// Appends a replicated entry at its own index.
    ///
    /// An index below [`next_index`](Self::next_index) truncates the log to
    /// `index - 1` first, so the supplied entry wins over the stored one.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::NonSequentialIndex`] if the index would leave
    /// a gap or is 0, and otherwise the errors of [`append`](Self::append).
    pub fn append_indexed(&mut self, indexed: Indexed<E>) -> JournalResult<Indexed<E>> {
        self.inner.ensure_open()?;
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

    /// Publishes `index` as committed. Syncs when flush-on-commit is set.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::NotOpen`] after close, or storage errors.
    pub fn commit(&mut self, index: u64) -> JournalResult<()> {
        self.inner.ensure_open()?;
        self.inner.set_commit_index(index);
        self.current.commit(index)
    }

    /// Makes `index` the next index written.
    ///
    /// An index past the current segment's start discards every segment
    /// and starts a fresh one at `index`; anything else truncates to
    /// `index - 1`.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::NotOpen`] after close, or storage errors.
    pub fn reset(&mut self, index: u64) -> JournalResult<()> {
        self.inner.ensure_open()?;
        if index > self.current.first_index() {
            let segment = self.inner.create_segment(index)?;
            for old in self.inner.segments() {
                if !Arc::ptr_eq(&old, &segment) {
                    self.inner.remove_segment(&old);
                }
            }
            self.current = Self::segment_writer(&self.inner, &self.codec, &segment)?;
            self.inner.notify_truncated(index - 1);
            debug!(journal = %self.inner.config().name, index, "reset journal");
            Ok(())
        } else {
            self.truncate(index.saturating_sub(1))
        }
    }

    /// Discards every entry above `index`, across segments.
    ///
    /// Readers positioned past `index` move back to `index + 1` on their
    /// next call.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::NotOpen`] after close, or storage errors.
    pub fn truncate(&mut self, index: u64) -> JournalResult<()> {
        self.inner.ensure_open()?;
        if index >= self.last_index() {
            return Ok(());
        }

        while index < self.current.first_index() {
            let first = self.inner.first_segment()?;
            if first.id() == self.current.segment().id() {
                break;
            }
            let retired = Arc::clone(self.current.segment().segment());
            self.inner.remove_segment(&retired);
            let last = self.inner.last_segment()?;
            self.current = Self::segment_writer(&self.inner, &self.codec, &last)?;
        }

        self.current.truncate(index)?;
        self.inner.notify_truncated(index);
        debug!(journal = %self.inner.config().name, index, "truncated journal");
        Ok(())
    }

    /// Syncs the current segment.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::NotOpen`] after close, or storage errors.
    pub fn flush(&mut self) -> JournalResult<()> {
        self.inner.ensure_open()?;
        self.current.flush()
    }

    fn roll_over(&mut self) -> JournalResult<()> {
        self.current.flush()?;
        let next_index = self.current.next_index();
        let segment = self.inner.create_segment(next_index)?;
        self.current.segment().seal();
        debug!(
            journal = %self.inner.config().name,
            sealed = self.current.segment().id(),
            segment_id = segment.id(),
            index = next_index,
            "rolled over to new segment"
        );
        self.current = Self::segment_writer(&self.inner, &self.codec, &segment)?;
        Ok(())
    }
}

impl<E, C> SegmentedJournalWriter<E, C> {
    /// Syncs the current segment without the open check.
    pub(crate) fn sync(&mut self) -> JournalResult<()> {
        self.current.flush()
    }
}

impl<E, C> std::fmt::Debug for SegmentedJournalWriter<E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentedJournalWriter")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}
