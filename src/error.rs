//! Error types for the commit log.
//!
//! The taxonomy mirrors the three failure kinds the log distinguishes:
//! *not-found* (an offset the log does not currently hold), *capacity*
//! (an index file has run out of pre-allocated slots, which drives segment
//! rollover rather than being surfaced to callers), and *I/O* (propagated
//! verbatim from the filesystem).

use std::io;

use thiserror::Error;

/// Error returned by [`crate::index::Index`] operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The index file has no more pre-allocated slots for another entry.
    #[error("index file has no space for another entry")]
    NoSpace,
    /// No valid entry exists at the requested position.
    #[error("no index entry at the requested position")]
    Eof,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Error returned by [`crate::segment::Segment`] operations.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// The segment holds no entry for the requested absolute offset.
    #[error("offset {offset} is out of range for this segment")]
    OffsetOutOfRange { offset: u64 },
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("failed to decode record at offset {offset}")]
    Decode {
        offset: u64,
        #[source]
        source: DecodeError,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Error returned by the public [`crate::Log`] API.
#[derive(Debug, Error)]
pub enum Error {
    /// The caller asked for an offset the log does not currently hold,
    /// either because it was never written or because it has been
    /// truncated away.
    #[error("offset {offset} is out of range")]
    OffsetOutOfRange { offset: u64 },
    #[error("failed to decode record at offset {offset}")]
    Decode {
        offset: u64,
        #[source]
        source: DecodeError,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<SegmentError> for Error {
    fn from(e: SegmentError) -> Self {
        match e {
            SegmentError::OffsetOutOfRange { offset } => Error::OffsetOutOfRange { offset },
            // `Segment::read` always resolves an out-of-range offset to
            // `OffsetOutOfRange` itself (it knows the offset); a bare index
            // EOF escaping here means the index ran out of pre-allocated
            // slots, which is a capacity failure, not a not-found.
            SegmentError::Index(IndexError::Eof) | SegmentError::Index(IndexError::NoSpace) => {
                Error::Io(io::Error::other("index has no entry or space for the request"))
            }
            SegmentError::Index(IndexError::Io(e)) => Error::Io(e),
            SegmentError::Decode { offset, source } => Error::Decode { offset, source },
            SegmentError::Io(e) => Error::Io(e),
        }
    }
}

/// Error decoding a record from its serialized form.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DecodeError(pub(crate) String);

impl DecodeError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}
