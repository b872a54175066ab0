//! # seglog storage
//!
//! Byte-store backends underneath seglog segments.
//!
//! A backend holds the raw bytes of exactly one segment: the fixed-size
//! descriptor followed by checksummed entry frames. Backends never look
//! inside those bytes; the journal crate owns the format.
//!
//! ## Contract
//!
//! - Writes only ever go to the end (`append`); the only way to rewrite
//!   history is `truncate`, which the journal uses to discard a torn or
//!   divergent tail.
//! - `size` is the logical end of data, including bytes still buffered.
//! - `sync` is the durability barrier.
//!
//! ## Backends
//!
//! - [`FileBackend`] - one OS file per segment, with a write buffer
//! - [`InMemoryBackend`] - a growable buffer, for `StorageLevel::Memory`
//!   journals and tests
//!
//! ## Example
//!
//! ```rust
//! use seglog_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"frame").unwrap();
//! assert_eq!(backend.read_at(offset, 5).unwrap(), b"frame");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
