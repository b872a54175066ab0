//! CBOR codec for serde types.

use crate::error::{CodecError, CodecResult};
use crate::Codec;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;

/// Encodes any serde type as a single CBOR item.
///
/// Output is deterministic as long as the type's `Serialize` impl is:
/// structs, enums, sequences and `BTreeMap`s are; `HashMap`s are not.
/// Decoding rejects payloads with bytes left over after the item.
pub struct CborCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> CborCodec<T> {
    /// Creates a codec for `T`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for CborCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for CborCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for CborCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CborCodec")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Codec<T> for CborCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, entry: &T, buf: &mut Vec<u8>) -> CodecResult<()> {
        ciborium::ser::into_writer(entry, buf)
            .map_err(|e| CodecError::encoding_failed(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<T> {
        let mut remaining = bytes;
        let value = ciborium::de::from_reader(&mut remaining)
            .map_err(|e| CodecError::decoding_failed(e.to_string()))?;
        if !remaining.is_empty() {
            return Err(CodecError::TrailingBytes {
                remaining: remaining.len(),
            });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum Command {
        Put { key: String, value: Vec<u8> },
        Delete { key: String },
    }

    #[test]
    fn encoding_is_deterministic() {
        let codec = CborCodec::<Command>::new();
        let command = Command::Put {
            key: "k".into(),
            value: vec![1, 2],
        };
        assert_eq!(
            codec.encode_to_vec(&command).unwrap(),
            codec.encode_to_vec(&command.clone()).unwrap()
        );
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let codec = CborCodec::<Command>::new();
        let mut bytes = codec
            .encode_to_vec(&Command::Delete { key: "k".into() })
            .unwrap();
        bytes.push(0x00);

        assert_eq!(
            codec.decode(&bytes),
            Err(CodecError::TrailingBytes { remaining: 1 })
        );
    }

    #[test]
    fn garbage_is_a_decoding_error() {
        let codec = CborCodec::<Command>::new();
        assert!(matches!(
            codec.decode(&[0xFF, 0x00]),
            Err(CodecError::DecodingFailed { .. })
        ));
    }
}
