//! The segmented journal: an ordered set of segments behind one writer.
//!
//! ```text
//! <directory>/
//! ├─ <name>-1.log    # entries 1..=n
//! ├─ <name>-2.log    # entries n+1..=m
//! └─ <name>-3.log    # current segment, receives appends
//! ```
//!
//! Segments are keyed by their first index in a concurrent ordered map.
//! The writer appends to the last segment and rolls over to a new one when
//! it fills up; readers walk the map across segment boundaries while the
//! writer and compaction mutate it.

mod reader;
mod writer;

pub use reader::SegmentedJournalReader;
pub use writer::SegmentedJournalWriter;

use crate::config::{JournalConfig, StorageLevel};
use crate::error::{JournalError, JournalResult};
use crate::segment::{
    parse_segment_id, segment_path, Segment, SegmentDescriptor, SparseIndex, DESCRIPTOR_BYTES,
};
use crate::types::{ReaderMode, SegmentId};
use crossbeam_skiplist::SkipMap;
use parking_lot::{Mutex, MutexGuard};
use seglog_codec::Codec;
use seglog_storage::{FileBackend, InMemoryBackend, StorageBackend};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Journal state shared by the writer and every reader.
pub(crate) struct JournalInner {
    config: JournalConfig,
    segments: SkipMap<u64, Arc<Segment>>,
    commit_index: AtomicU64,
    open: AtomicBool,
    next_segment_id: AtomicU64,
    readers: Mutex<HashMap<u64, Arc<AtomicU64>>>,
    next_reader_id: AtomicU64,
}

impl JournalInner {
    fn open(config: JournalConfig) -> JournalResult<Self> {
        config.validate()?;
        let inner = Self {
            config,
            segments: SkipMap::new(),
            commit_index: AtomicU64::new(0),
            open: AtomicBool::new(true),
            next_segment_id: AtomicU64::new(1),
            readers: Mutex::new(HashMap::new()),
            next_reader_id: AtomicU64::new(1),
        };

        if inner.config.storage_level == StorageLevel::Disk {
            inner.load_segments()?;
        }
        if inner.segments.is_empty() {
            inner.create_segment(1)?;
        }
        Ok(inner)
    }

    /// Loads every segment file of this journal from the directory.
    ///
    /// All but the last segment are scanned here; the last one is scanned
    /// when the writer opens on it. A corrupt frame in an earlier segment
    /// ends the log there: every later segment is deleted and the damaged
    /// one becomes the last.
    fn load_segments(&self) -> JournalResult<()> {
        let directory = &self.config.directory;
        std::fs::create_dir_all(directory)?;

        let mut loaded = Vec::new();
        let mut max_id = 0;
        for dir_entry in std::fs::read_dir(directory)? {
            let dir_entry = dir_entry?;
            let file_name = dir_entry.file_name();
            let Some(id) = file_name
                .to_str()
                .and_then(|f| parse_segment_id(&self.config.name, f))
            else {
                continue;
            };
            max_id = max_id.max(id);

            let path = dir_entry.path();
            let len = dir_entry.metadata()?.len();
            if len < DESCRIPTOR_BYTES as u64 {
                warn!(path = %path.display(), len, "skipping segment file shorter than a descriptor");
                continue;
            }

            let backend = FileBackend::open(&path)?;
            let segment = Segment::load(
                Box::new(backend),
                Some(path.clone()),
                self.sparse_index(),
                self.config.max_entry_size,
            )?;
            if segment.id() != id {
                warn!(
                    path = %path.display(),
                    descriptor_id = segment.id(),
                    "segment file name and descriptor disagree on id"
                );
            }
            max_id = max_id.max(segment.id());
            loaded.push(Arc::new(segment));
        }

        loaded.sort_by_key(|segment| segment.index());
        if let Some(damaged) = Self::first_damaged(&loaded)? {
            for segment in loaded.drain(damaged + 1..) {
                warn!(
                    segment_id = segment.id(),
                    index = segment.index(),
                    "dropping segment that follows a corrupt frame"
                );
                segment.retire();
            }
        }
        let count = loaded.len();
        for (position, segment) in loaded.into_iter().enumerate() {
            if position + 1 < count {
                segment.seal();
            }
            if let Some(previous) = self.segments.get(&segment.index()) {
                warn!(
                    index = segment.index(),
                    kept = segment.id(),
                    dropped = previous.value().id(),
                    "two segments start at the same index"
                );
            }
            self.segments.insert(segment.index(), segment);
        }
        self.next_segment_id.store(max_id + 1, Ordering::SeqCst);

        info!(
            journal = %self.config.name,
            directory = %directory.display(),
            segments = count,
            "loaded journal segments"
        );
        Ok(())
    }

    /// Scans every segment but the last and returns the position of the
    /// first one that stops at an invalid frame.
    fn first_damaged(loaded: &[Arc<Segment>]) -> JournalResult<Option<usize>> {
        let sealed = loaded.len().saturating_sub(1);
        for (position, segment) in loaded[..sealed].iter().enumerate() {
            if segment.scan(0)?.corrupt_at.is_some() {
                return Ok(Some(position));
            }
        }
        Ok(None)
    }

    fn sparse_index(&self) -> SparseIndex {
        SparseIndex::new(self.config.index_density)
    }

    /// Creates a segment starting at `index` and makes it the last one.
    pub(crate) fn create_segment(&self, index: u64) -> JournalResult<Arc<Segment>> {
        let id: SegmentId = self.next_segment_id.fetch_add(1, Ordering::SeqCst);
        let descriptor = SegmentDescriptor::new(id, index, self.config.max_segment_size);
        let (backend, path) = match self.config.storage_level {
            StorageLevel::Disk => {
                let path = segment_path(&self.config.directory, &self.config.name, id);
                let backend: Box<dyn StorageBackend> = Box::new(FileBackend::create(&path)?);
                (backend, Some(path))
            }
            StorageLevel::Memory => {
                let backend: Box<dyn StorageBackend> = Box::new(InMemoryBackend::new());
                (backend, None)
            }
        };

        let segment = Arc::new(Segment::create(
            descriptor,
            backend,
            path,
            self.sparse_index(),
            self.config.max_entry_size,
        )?);
        self.segments.insert(index, Arc::clone(&segment));
        Ok(segment)
    }

    /// Drops `segment` from the map and retires it.
    pub(crate) fn remove_segment(&self, segment: &Arc<Segment>) {
        if let Some(entry) = self.segments.get(&segment.index()) {
            if Arc::ptr_eq(entry.value(), segment) {
                entry.remove();
            }
        }
        segment.retire();
    }

    pub(crate) fn first_segment(&self) -> JournalResult<Arc<Segment>> {
        self.segments
            .front()
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| JournalError::invalid_format("journal has no segments"))
    }

    pub(crate) fn last_segment(&self) -> JournalResult<Arc<Segment>> {
        self.segments
            .back()
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| JournalError::invalid_format("journal has no segments"))
    }

    /// Returns the segment that holds `index`.
    ///
    /// Indexes past the last segment's start map to the last segment;
    /// indexes before the first segment map to the first.
    pub(crate) fn get_segment(&self, index: u64) -> JournalResult<Arc<Segment>> {
        let last = self.last_segment()?;
        if index > last.index() {
            return Ok(last);
        }
        match self.segments.upper_bound(Bound::Included(&index)) {
            Some(entry) => Ok(Arc::clone(entry.value())),
            None => self.first_segment(),
        }
    }

    /// Returns the segment after the one starting at `index`.
    pub(crate) fn get_next_segment(&self, index: u64) -> Option<Arc<Segment>> {
        self.segments
            .lower_bound(Bound::Excluded(&index))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Snapshot of the live segments in index order.
    pub(crate) fn segments(&self) -> Vec<Arc<Segment>> {
        self.segments
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub(crate) fn config(&self) -> &JournalConfig {
        &self.config
    }

    pub(crate) fn commit_index(&self) -> u64 {
        self.commit_index.load(Ordering::Acquire)
    }

    /// Publishes a commit index. The watermark never moves backwards.
    pub(crate) fn set_commit_index(&self, index: u64) {
        self.commit_index.fetch_max(index, Ordering::Release);
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub(crate) fn ensure_open(&self) -> JournalResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(JournalError::NotOpen)
        }
    }

    /// Registers a reader and returns its id and reposition mailbox.
    ///
    /// The mailbox holds `u64::MAX` until a truncation asks the reader to
    /// move back to the held index.
    pub(crate) fn register_reader(&self) -> (u64, Arc<AtomicU64>) {
        let id = self.next_reader_id.fetch_add(1, Ordering::Relaxed);
        let mailbox = Arc::new(AtomicU64::new(u64::MAX));
        self.readers.lock().insert(id, Arc::clone(&mailbox));
        (id, mailbox)
    }

    pub(crate) fn unregister_reader(&self, id: u64) {
        self.readers.lock().remove(&id);
    }

    /// Tells every reader that entries above `index` are gone.
    pub(crate) fn notify_truncated(&self, index: u64) {
        let target = index.saturating_add(1);
        for mailbox in self.readers.lock().values() {
            mailbox.fetch_min(target, Ordering::AcqRel);
        }
    }

    fn reader_count(&self) -> usize {
        self.readers.lock().len()
    }

    /// Retires every segment that lies entirely below `index`. The last
    /// segment always survives.
    fn compact(&self, index: u64) -> JournalResult<()> {
        let Some(floor) = self.segments.upper_bound(Bound::Included(&index)) else {
            return Ok(());
        };
        let floor_index = *floor.key();
        let last_index = self.last_segment()?.index();

        let retired: Vec<Arc<Segment>> = self
            .segments
            .range(..floor_index)
            .filter(|entry| *entry.key() != last_index)
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for segment in &retired {
            self.remove_segment(segment);
        }
        if !retired.is_empty() {
            debug!(
                journal = %self.config.name,
                index,
                retired = retired.len(),
                "compacted journal"
            );
        }
        Ok(())
    }
}

/// A segmented, checksummed, append-only journal of `E` entries.
///
/// # Thread Safety
///
/// The journal is `Sync`: the writer sits behind a mutex, readers are
/// independent values that share the segment map. A reader never blocks
/// the writer.
///
/// # Example
///
/// ```rust
/// use seglog_codec::BytesCodec;
/// use seglog_journal::{JournalConfig, ReaderMode, SegmentedJournal, StorageLevel};
///
/// let config = JournalConfig::new().storage_level(StorageLevel::Memory);
/// let journal = SegmentedJournal::<Vec<u8>, _>::open(config, BytesCodec).unwrap();
///
/// let indexed = journal.writer().unwrap().append(b"hello".to_vec()).unwrap();
/// assert_eq!(indexed.index(), 1);
///
/// let mut reader = journal.open_reader(1, ReaderMode::All).unwrap();
/// assert_eq!(reader.next().unwrap().unwrap().entry(), b"hello");
/// ```
pub struct SegmentedJournal<E, C> {
    inner: Arc<JournalInner>,
    codec: Arc<C>,
    writer: Mutex<SegmentedJournalWriter<E, C>>,
    _entry: PhantomData<fn() -> E>,
}

impl<E: Clone, C: Codec<E>> SegmentedJournal<E, C> {
    /// Opens or creates the journal described by `config`.
    ///
    /// Existing segments are recovered: every frame is checksummed, the
    /// last segment is cut back to its last valid frame, and a fresh
    /// segment starting at index 1 is created when there is none.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::InvalidConfig`] for a bad configuration and
    /// storage or codec errors from recovery.
    pub fn open(config: JournalConfig, codec: C) -> JournalResult<Self> {
        let inner = Arc::new(JournalInner::open(config)?);
        let codec = Arc::new(codec);
        let writer = SegmentedJournalWriter::open(Arc::clone(&inner), Arc::clone(&codec))?;
        info!(
            journal = %inner.config().name,
            segments = inner.segments.len(),
            next_index = writer.next_index(),
            "opened journal"
        );
        Ok(Self {
            inner,
            codec,
            writer: Mutex::new(writer),
            _entry: PhantomData,
        })
    }

    /// Returns the journal configuration.
    #[must_use]
    pub fn config(&self) -> &JournalConfig {
        self.inner.config()
    }

    /// Returns the journal name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.config().name
    }

    /// Locks and returns the journal writer.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::NotOpen`] after [`close`](Self::close).
    pub fn writer(&self) -> JournalResult<MutexGuard<'_, SegmentedJournalWriter<E, C>>> {
        self.inner.ensure_open()?;
        Ok(self.writer.lock())
    }

    /// Opens a reader whose first `next()` returns entry `index`.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::NotOpen`] after close, or storage and codec
    /// errors while positioning.
    pub fn open_reader(
        &self,
        index: u64,
        mode: ReaderMode,
    ) -> JournalResult<SegmentedJournalReader<E, C>> {
        self.inner.ensure_open()?;
        SegmentedJournalReader::open(Arc::clone(&self.inner), Arc::clone(&self.codec), index, mode)
    }

    /// Retires every segment whose entries all lie below `index`.
    ///
    /// Files of retired segments are deleted once no reader holds them.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::NotOpen`] after close.
    pub fn compact(&self, index: u64) -> JournalResult<()> {
        self.inner.ensure_open()?;
        self.inner.compact(index)
    }

    /// Returns the published commit index.
    #[must_use]
    pub fn commit_index(&self) -> u64 {
        self.inner.commit_index()
    }

    /// Flushes the writer and closes the journal. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns storage errors from the final flush.
    pub fn close(&self) -> JournalResult<()> {
        if !self.inner.is_open() {
            return Ok(());
        }
        let mut writer = self.writer.lock();
        if !self.inner.is_open() {
            return Ok(());
        }
        writer.sync()?;
        self.inner.open.store(false, Ordering::Release);
        info!(journal = %self.name(), last_index = writer.last_index(), "closed journal");
        Ok(())
    }

    /// Returns true until [`close`](Self::close) succeeds.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    /// Returns the number of live segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.inner.segments.len()
    }

    /// Returns the first index held by the journal.
    #[must_use]
    pub fn first_index(&self) -> u64 {
        self.inner
            .segments
            .front()
            .map_or(1, |entry| entry.value().index())
    }

    /// Returns the number of readers that have not been dropped.
    #[must_use]
    pub fn open_reader_count(&self) -> usize {
        self.inner.reader_count()
    }

    /// Returns the descriptors of the live segments in index order.
    #[must_use]
    pub fn segments(&self) -> Vec<SegmentDescriptor> {
        self.inner
            .segments()
            .iter()
            .map(|segment| *segment.descriptor())
            .collect()
    }
}

impl<E, C> Drop for SegmentedJournal<E, C> {
    fn drop(&mut self) {
        if self.inner.is_open() {
            if let Err(err) = self.writer.get_mut().sync() {
                warn!(journal = %self.inner.config().name, error = %err, "flush on drop failed");
            }
            self.inner.open.store(false, Ordering::Release);
        }
    }
}

impl<E, C> std::fmt::Debug for SegmentedJournal<E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentedJournal")
            .field("name", &self.inner.config().name)
            .field("segments", &self.inner.segments.len())
            .field("commit_index", &self.inner.commit_index())
            .field("open", &self.inner.is_open())
            .finish_non_exhaustive()
    }
}
