//! # seglog codec
//!
//! The entry codec contract for seglog journals.
//!
//! A journal stores opaque entries. Turning an entry into frame payload
//! bytes and back is the job of a [`Codec`]; the journal only adds the
//! length and checksum around whatever the codec produced.
//!
//! ## Contract
//!
//! - `decode(encode(e)) == e` for every entry
//! - Encoding is deterministic and depends on nothing but the entry
//! - `decode` gets exactly the bytes `encode` wrote, no more and no less
//!
//! ## Stock codecs
//!
//! - [`BytesCodec`] - identity codec for `Bytes` / `Vec<u8>` entries
//! - [`CborCodec`] - CBOR via `ciborium` for any serde type
//!
//! ## Usage
//!
//! ```
//! use seglog_codec::{Codec, CborCodec};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Entry {
//!     term: u64,
//!     command: String,
//! }
//!
//! let codec = CborCodec::<Entry>::new();
//! let entry = Entry { term: 3, command: "set x".into() };
//! let bytes = codec.encode_to_vec(&entry).unwrap();
//! assert_eq!(codec.decode(&bytes).unwrap(), entry);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bytes;
mod cbor;
mod error;

pub use crate::bytes::BytesCodec;
pub use cbor::CborCodec;
pub use error::{CodecError, CodecResult};

/// Encodes and decodes journal entries of type `E`.
///
/// Codecs are shared between the writer and every reader of a journal, so
/// they must be `Send + Sync` and must not keep per-call state.
pub trait Codec<E>: Send + Sync {
    /// Appends the encoded form of `entry` to `buf`.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be represented.
    fn encode(&self, entry: &E, buf: &mut Vec<u8>) -> CodecResult<()>;

    /// Rebuilds an entry from exactly the bytes `encode` produced.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid encoding.
    fn decode(&self, bytes: &[u8]) -> CodecResult<E>;

    /// Encodes `entry` into a fresh buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be represented.
    fn encode_to_vec(&self, entry: &E) -> CodecResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.encode(entry, &mut buf)?;
        Ok(buf)
    }
}

impl<E, C: Codec<E> + ?Sized> Codec<E> for std::sync::Arc<C> {
    fn encode(&self, entry: &E, buf: &mut Vec<u8>) -> CodecResult<()> {
        (**self).encode(entry, buf)
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<E> {
        (**self).decode(bytes)
    }
}
