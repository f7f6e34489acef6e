//! A persistent, segmented, append-only commit log.
//!
//! Records are addressed by a monotonically increasing 64-bit offset. The
//! log is organized as an ordered list of segments, each pairing a
//! length-prefixed store file with a fixed-width, memory-mapped index
//! file; segments roll over once a configured size cap is reached, and the
//! whole thing recovers its state from the filesystem alone on restart.
//!
//! ```no_run
//! use bytes::Bytes;
//! use commitlog::{Config, Log, Record};
//!
//! # fn main() -> Result<(), commitlog::Error> {
//! let log = Log::open("/tmp/my-log", Config::default())?;
//!
//! let mut record = Record::new(Bytes::from_static(b"hello world"));
//! let offset = log.append(&mut record)?;
//!
//! let read: Record = log.read(offset)?;
//! assert_eq!(read.value, Bytes::from_static(b"hello world"));
//! # Ok(())
//! # }
//! ```

mod error;
mod index;
mod log;
mod record;
mod segment;
mod store;

pub use error::{DecodeError, Error, IndexError, SegmentError};
pub use log::{Config, Log, Reader};
pub use record::{Decode, Encode, Record};
pub use segment::{HasOffset, SegmentConfig};

#[cfg(feature = "test")]
/// Install an `env_logger` sink for the crate's `log` output, suitable for
/// `cargo test -- --nocapture`. No-op if a logger is already installed.
pub fn init_test_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// The minimal capability surface a consumer needs: append and read by
/// offset. Exists so tests (and RPC-layer collaborators) can substitute an
/// in-memory log without depending on [`Log`]'s full API.
pub trait CommitLog<T: Encode + Decode + HasOffset> {
    fn append(&self, record: &mut T) -> Result<u64, Error>;
    fn read(&self, offset: u64) -> Result<T, Error>;
}

impl<T: Encode + Decode + HasOffset> CommitLog<T> for Log {
    fn append(&self, record: &mut T) -> Result<u64, Error> {
        Log::append(self, record)
    }

    fn read(&self, offset: u64) -> Result<T, Error> {
        Log::read(self, offset)
    }
}
