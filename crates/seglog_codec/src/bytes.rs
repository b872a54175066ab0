//! Identity codec for raw byte entries.

use crate::error::CodecResult;
use crate::Codec;
use bytes::Bytes;

/// Stores byte entries verbatim.
///
/// The frame length already delimits the payload, so no extra header is
/// written. Implemented for both [`Bytes`] and `Vec<u8>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCodec;

impl Codec<Bytes> for BytesCodec {
    fn encode(&self, entry: &Bytes, buf: &mut Vec<u8>) -> CodecResult<()> {
        buf.extend_from_slice(entry);
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<Bytes> {
        Ok(Bytes::copy_from_slice(bytes))
    }
}

impl Codec<Vec<u8>> for BytesCodec {
    fn encode(&self, entry: &Vec<u8>, buf: &mut Vec<u8>) -> CodecResult<()> {
        buf.extend_from_slice(entry);
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_appends_to_buffer() {
        let mut buf = vec![0xAA];
        Codec::<Vec<u8>>::encode(&BytesCodec, &vec![1, 2, 3], &mut buf).unwrap();
        assert_eq!(buf, vec![0xAA, 1, 2, 3]);
    }

    #[test]
    fn empty_entry_roundtrips() {
        let encoded = BytesCodec.encode_to_vec(&Bytes::new()).unwrap();
        assert!(encoded.is_empty());
        let decoded: Bytes = BytesCodec.decode(&encoded).unwrap();
        assert!(decoded.is_empty());
    }
}
