//! Segments: bounded files holding a contiguous run of entries.
//!
//! A segment is a [`SegmentDescriptor`] followed by checksummed frames. The
//! journal keeps every live segment in an ordered map; writers and readers
//! hold a [`SegmentPin`] on the segment they work in, and a retired
//! segment's file is only deleted once the last pin is gone.

mod descriptor;
mod file;
mod frame;
mod index;
mod reader;
mod writer;

pub use descriptor::{SegmentDescriptor, DESCRIPTOR_BYTES};
pub use file::{
    is_segment_file, parse_segment_id, segment_file_name, segment_path, SEGMENT_EXTENSION,
};
pub use frame::{checksum, encode_frame, FRAME_HEADER_BYTES};
pub use index::{Position, SparseIndex};
pub use reader::SegmentReader;
pub use writer::SegmentWriter;

pub(crate) use frame::Frame;

use crate::error::JournalResult;
use crate::types::SegmentId;
use parking_lot::RwLock;
use seglog_storage::StorageBackend;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Lifecycle of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SegmentState {
    /// Descriptor written, never pinned.
    Created = 0,
    /// Being written or read.
    Active = 1,
    /// Superseded by a newer current segment; read-only.
    Sealed = 2,
    /// Retired and unpinned; the file is gone.
    Reclaimed = 3,
}

impl SegmentState {
    fn from_byte(b: u8) -> Self {
        match b {
            0 => Self::Created,
            1 => Self::Active,
            2 => Self::Sealed,
            _ => Self::Reclaimed,
        }
    }
}

/// Result of walking a segment's frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Number of valid frames.
    pub entries: u64,
    /// Offset just past the last valid frame.
    pub end: u64,
    /// Index and payload of the last valid frame.
    pub last: Option<(u64, Vec<u8>)>,
    /// Offset of the first invalid frame, if the scan stopped at one.
    pub corrupt_at: Option<u64>,
}

/// One segment of a journal.
pub struct Segment {
    descriptor: SegmentDescriptor,
    backend: RwLock<Box<dyn StorageBackend>>,
    sparse: RwLock<SparseIndex>,
    path: Option<PathBuf>,
    max_entry_size: u32,
    references: AtomicUsize,
    state: AtomicU8,
    retired: AtomicBool,
    deleted: AtomicBool,
}

impl Segment {
    /// Writes `descriptor` into an empty store and wraps it.
    pub(crate) fn create(
        descriptor: SegmentDescriptor,
        mut backend: Box<dyn StorageBackend>,
        path: Option<PathBuf>,
        sparse: SparseIndex,
        max_entry_size: u32,
    ) -> JournalResult<Self> {
        backend.append(&descriptor.encode())?;
        backend.flush()?;
        debug!(
            segment_id = descriptor.id(),
            index = descriptor.index(),
            "created segment"
        );
        Ok(Self::new(descriptor, backend, path, sparse, max_entry_size))
    }

    /// Wraps an existing store, reading its descriptor.
    ///
    /// The store is not scanned; call [`scan`](Self::scan) to validate the
    /// frames and fill the sparse index.
    ///
    /// # Errors
    ///
    /// Returns [`crate::JournalError::InvalidFormat`] if the descriptor is
    /// missing or malformed.
    pub fn load(
        backend: Box<dyn StorageBackend>,
        path: Option<PathBuf>,
        sparse: SparseIndex,
        max_entry_size: u32,
    ) -> JournalResult<Self> {
        let descriptor = SegmentDescriptor::read_from(backend.as_ref())?;
        debug!(
            segment_id = descriptor.id(),
            index = descriptor.index(),
            "loaded segment"
        );
        Ok(Self::new(descriptor, backend, path, sparse, max_entry_size))
    }

    fn new(
        descriptor: SegmentDescriptor,
        backend: Box<dyn StorageBackend>,
        path: Option<PathBuf>,
        sparse: SparseIndex,
        max_entry_size: u32,
    ) -> Self {
        Self {
            descriptor,
            backend: RwLock::new(backend),
            sparse: RwLock::new(sparse),
            path,
            max_entry_size,
            references: AtomicUsize::new(0),
            state: AtomicU8::new(SegmentState::Created as u8),
            retired: AtomicBool::new(false),
            deleted: AtomicBool::new(false),
        }
    }

    /// Returns the segment descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &SegmentDescriptor {
        &self.descriptor
    }

    /// Returns the segment id.
    #[must_use]
    pub fn id(&self) -> SegmentId {
        self.descriptor.id()
    }

    /// Returns the index of the first entry this segment holds.
    #[must_use]
    pub fn index(&self) -> u64 {
        self.descriptor.index()
    }

    /// Returns the file path, or `None` for in-memory segments.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SegmentState {
        SegmentState::from_byte(self.state.load(Ordering::Acquire))
    }

    /// Returns the number of live pins.
    #[must_use]
    pub fn references(&self) -> usize {
        self.references.load(Ordering::SeqCst)
    }

    /// Returns true once the journal has dropped this segment.
    #[must_use]
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::SeqCst)
    }

    /// Returns the number of bytes used, descriptor included.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot report its size.
    pub fn size(&self) -> JournalResult<u64> {
        Ok(self.backend.read().size()?)
    }

    /// Returns true if no frame has been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot report its size.
    pub fn is_empty(&self) -> JournalResult<bool> {
        Ok(self.size()? <= DESCRIPTOR_BYTES as u64)
    }

    /// Pins the segment. The pin is released when dropped.
    #[must_use]
    pub fn pin(self: &Arc<Self>) -> SegmentPin {
        self.references.fetch_add(1, Ordering::SeqCst);
        let _ = self.state.compare_exchange(
            SegmentState::Created as u8,
            SegmentState::Active as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        SegmentPin {
            segment: Arc::clone(self),
        }
    }

    fn release(&self) {
        let previous = self.references.fetch_sub(1, Ordering::SeqCst);
        if previous == 1 && self.is_retired() {
            self.reclaim();
        }
    }

    /// Marks the segment read-only after rollover moved past it.
    pub(crate) fn seal(&self) {
        let _ = self.state.compare_exchange(
            SegmentState::Active as u8,
            SegmentState::Sealed as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Makes a sealed segment writable again after the log was truncated
    /// back into it.
    pub(crate) fn activate(&self) {
        let _ = self.state.compare_exchange(
            SegmentState::Sealed as u8,
            SegmentState::Active as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Drops the segment from the journal. The file goes away as soon as
    /// no pin remains.
    pub(crate) fn retire(&self) {
        if self.retired.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(segment_id = self.id(), index = self.index(), "retired segment");
        if self.references() == 0 {
            self.reclaim();
        }
    }

    fn reclaim(&self) {
        if self.deleted.swap(true, Ordering::SeqCst) {
            return;
        }
        self.state
            .store(SegmentState::Reclaimed as u8, Ordering::Release);
        if let Some(path) = &self.path {
            match std::fs::remove_file(path) {
                Ok(()) => debug!(segment_id = self.id(), path = %path.display(), "deleted segment file"),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => warn!(
                    segment_id = self.id(),
                    path = %path.display(),
                    error = %err,
                    "failed to delete retired segment file"
                ),
            }
        }
    }

    pub(crate) fn backend(&self) -> &RwLock<Box<dyn StorageBackend>> {
        &self.backend
    }

    pub(crate) fn sparse_index(&self) -> &RwLock<SparseIndex> {
        &self.sparse
    }

    pub(crate) fn max_entry_size(&self) -> u32 {
        self.max_entry_size
    }

    /// Reads and validates the frame at `position`.
    pub(crate) fn read_frame(&self, position: u64) -> JournalResult<Option<Frame>> {
        let backend = self.backend.read();
        frame::read_frame(backend.as_ref(), self.id(), position, self.max_entry_size)
    }

    /// Walks the frames from the start of the segment, re-recording sampled
    /// offsets in the sparse index.
    ///
    /// Stops at the first invalid frame, or after entry `limit` when `limit`
    /// is non-zero. Corruption ends the scan; it is logged and reported, not
    /// returned as an error.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub fn scan(&self, limit: u64) -> JournalResult<ScanReport> {
        let mut report = ScanReport {
            entries: 0,
            end: DESCRIPTOR_BYTES as u64,
            last: None,
            corrupt_at: None,
        };
        let mut next_index = self.index();

        while limit == 0 || next_index <= limit {
            match self.read_frame(report.end) {
                Ok(Some(frame)) => {
                    self.sparse.write().index(next_index, frame.position);
                    report.entries += 1;
                    report.end = frame.end();
                    report.last = Some((next_index, frame.payload));
                    next_index += 1;
                }
                Ok(None) => break,
                Err(err) if err.is_corruption() => {
                    warn!(
                        segment_id = self.id(),
                        position = report.end,
                        error = %err,
                        "segment scan stopped at invalid frame"
                    );
                    report.corrupt_at = Some(report.end);
                    break;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(report)
    }
}

impl std::fmt::Debug for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segment")
            .field("descriptor", &self.descriptor)
            .field("path", &self.path)
            .field("state", &self.state())
            .field("references", &self.references())
            .field("retired", &self.is_retired())
            .finish_non_exhaustive()
    }
}

/// A counted reference that keeps a segment's file alive.
#[derive(Debug)]
pub struct SegmentPin {
    segment: Arc<Segment>,
}

impl SegmentPin {
    /// Returns the shared segment handle.
    #[must_use]
    pub fn segment(&self) -> &Arc<Segment> {
        &self.segment
    }
}

impl Clone for SegmentPin {
    fn clone(&self) -> Self {
        self.segment.pin()
    }
}

impl Deref for SegmentPin {
    type Target = Segment;

    fn deref(&self) -> &Segment {
        &self.segment
    }
}

impl Drop for SegmentPin {
    fn drop(&mut self) {
        self.segment.release();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use seglog_storage::{FileBackend, InMemoryBackend};
    use tempfile::tempdir;

    pub(crate) fn memory_segment(id: SegmentId, index: u64, max_segment_size: u32) -> Arc<Segment> {
        let descriptor = SegmentDescriptor::new(id, index, max_segment_size);
        Arc::new(
            Segment::create(
                descriptor,
                Box::new(InMemoryBackend::new()),
                None,
                SparseIndex::with_step(2),
                1024,
            )
            .unwrap(),
        )
    }

    fn append_frames(segment: &Segment, payloads: &[&[u8]]) {
        let mut backend = segment.backend().write();
        for payload in payloads {
            backend.append(&encode_frame(payload).unwrap()).unwrap();
        }
    }

    #[test]
    fn create_writes_descriptor() {
        let segment = memory_segment(4, 10, 4096);

        assert_eq!(segment.id(), 4);
        assert_eq!(segment.index(), 10);
        assert_eq!(segment.size().unwrap(), DESCRIPTOR_BYTES as u64);
        assert!(segment.is_empty().unwrap());
        assert_eq!(segment.state(), SegmentState::Created);

        let backend = segment.backend().read();
        let descriptor = SegmentDescriptor::read_from(backend.as_ref()).unwrap();
        assert_eq!(&descriptor, segment.descriptor());
    }

    #[test]
    fn pins_count_references() {
        let segment = memory_segment(1, 1, 4096);

        let first = segment.pin();
        assert_eq!(segment.state(), SegmentState::Active);
        let second = first.clone();
        assert_eq!(segment.references(), 2);

        drop(first);
        assert_eq!(segment.references(), 1);
        drop(second);
        assert_eq!(segment.references(), 0);
    }

    #[test]
    fn seal_and_activate() {
        let segment = memory_segment(1, 1, 4096);
        let _pin = segment.pin();

        segment.seal();
        assert_eq!(segment.state(), SegmentState::Sealed);
        segment.activate();
        assert_eq!(segment.state(), SegmentState::Active);
    }

    #[test]
    fn retired_file_survives_until_last_pin() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal-1.log");
        let segment = Arc::new(
            Segment::create(
                SegmentDescriptor::new(1, 1, 4096),
                Box::new(FileBackend::create(&path).unwrap()),
                Some(path.clone()),
                SparseIndex::with_step(1),
                1024,
            )
            .unwrap(),
        );

        let pin = segment.pin();
        segment.retire();
        assert!(segment.is_retired());
        assert!(path.exists());

        drop(pin);
        assert!(!path.exists());
        assert_eq!(segment.state(), SegmentState::Reclaimed);
    }

    #[test]
    fn retiring_unpinned_segment_deletes_immediately() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal-2.log");
        let segment = Segment::create(
            SegmentDescriptor::new(2, 5, 4096),
            Box::new(FileBackend::create(&path).unwrap()),
            Some(path.clone()),
            SparseIndex::with_step(1),
            1024,
        )
        .unwrap();

        segment.retire();
        segment.retire();
        assert!(!path.exists());
    }

    #[test]
    fn scan_counts_frames_and_rebuilds_index() {
        let segment = memory_segment(1, 1, 4096);
        append_frames(&segment, &[b"a", b"bb", b"ccc", b"dddd"]);

        let report = segment.scan(0).unwrap();
        assert_eq!(report.entries, 4);
        assert_eq!(report.end, segment.size().unwrap());
        assert_eq!(report.last, Some((4, b"dddd".to_vec())));
        assert_eq!(report.corrupt_at, None);

        let sparse = segment.sparse_index().read();
        assert_eq!(sparse.len(), 2);
        assert_eq!(
            sparse.lookup(3),
            Some(Position {
                index: 2,
                position: DESCRIPTOR_BYTES as u64 + 9
            })
        );
    }

    #[test]
    fn scan_honours_limit() {
        let segment = memory_segment(1, 10, 4096);
        append_frames(&segment, &[b"a", b"bb", b"ccc"]);

        let report = segment.scan(11).unwrap();
        assert_eq!(report.entries, 2);
        assert_eq!(report.last, Some((11, b"bb".to_vec())));
    }

    #[test]
    fn scan_stops_at_corruption() {
        let mut image = SegmentDescriptor::new(1, 1, 4096).encode().to_vec();
        for payload in [&b"good"[..], b"evil", b"after"] {
            image.extend_from_slice(&encode_frame(payload).unwrap());
        }
        let second = DESCRIPTOR_BYTES as u64 + 12;
        let backend = InMemoryBackend::with_data(image);
        backend.corrupt_byte(second + FRAME_HEADER_BYTES as u64).unwrap();

        let segment = Segment::load(Box::new(backend), None, SparseIndex::with_step(1), 1024)
            .unwrap();
        let report = segment.scan(0).unwrap();
        assert_eq!(report.entries, 1);
        assert_eq!(report.end, second);
        assert_eq!(report.corrupt_at, Some(second));
        assert_eq!(report.last, Some((1, b"good".to_vec())));
    }
}
