//! The record codec.
//!
//! The log itself only ever handles opaque byte blobs: it stamps the
//! assigned offset onto a record and hands the result to a caller-supplied
//! codec for encoding, and does the reverse on read. An `Encode`/`Decode`
//! trait pair carries that contract, plus a built-in `Record` type for
//! callers who just want an offset and a byte value.

use bytes::Bytes;

use crate::error::DecodeError;

/// A record that can be encoded into the log's on-disk payload format.
pub trait Encode {
    /// Encode `self` into `out`, appending to whatever is already there.
    fn encode(&self, out: &mut Vec<u8>);
}

/// A record that can be decoded back from its on-disk payload format.
pub trait Decode: Sized {
    /// Decode a record from `buf`.
    ///
    /// `buf` is exactly the bytes previously produced by [`Encode::encode`]
    /// for one record; there is no surrounding length prefix to strip, as
    /// the store already frames the payload.
    fn decode(buf: &[u8]) -> Result<Self, DecodeError>;
}

/// An assigned offset plus an opaque value.
///
/// Callers who don't need a richer record type can use this directly.
/// Its wire format is `offset:u64-big-endian || value:bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub offset: u64,
    pub value: Bytes,
}

impl Record {
    pub fn new(value: impl Into<Bytes>) -> Self {
        Self {
            offset: 0,
            value: value.into(),
        }
    }
}

impl Encode for Record {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.offset.to_be_bytes());
        out.extend_from_slice(&self.value);
    }
}

impl Decode for Record {
    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < 8 {
            return Err(DecodeError::new(format!(
                "record too short: expected at least 8 bytes, got {}",
                buf.len()
            )));
        }
        let (offset_bytes, value) = buf.split_at(8);
        let offset = u64::from_be_bytes(offset_bytes.try_into().expect("split_at(8) yields 8 bytes"));
        Ok(Record {
            offset,
            value: Bytes::copy_from_slice(value),
        })
    }
}
