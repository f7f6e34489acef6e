//! The length-prefixed append file underlying a segment.
//!
//! A store is a flat file of frames, each `len:u64-be || payload`. Writes go
//! through a buffered writer to amortize syscalls; every read path flushes
//! that buffer first under the same lock, so a reader can never observe a
//! torn length prefix from a concurrent append.

use std::fs::File;
use std::io::{self, BufWriter, Write as _};
use std::os::unix::fs::FileExt as _;

use parking_lot::Mutex;

/// Width, in bytes, of the length prefix on each frame.
pub const LEN_WIDTH: u64 = 8;

#[derive(Debug)]
struct Inner {
    writer: BufWriter<File>,
    size: u64,
    closed: bool,
}

/// An append-only, length-prefixed byte store backed by a single file.
#[derive(Debug)]
pub struct Store {
    inner: Mutex<Inner>,
}

impl Store {
    /// Wrap an already-open file as a store, picking up its current size.
    pub fn open(file: File) -> io::Result<Self> {
        let size = file.metadata()?.len();
        Ok(Self {
            inner: Mutex::new(Inner {
                writer: BufWriter::new(file),
                size,
                closed: false,
            }),
        })
    }

    /// Append `payload`, returning `(bytes_written, position)`.
    ///
    /// `position` is the byte offset at which the frame's length prefix
    /// begins, measured before the write; `bytes_written` is always
    /// `LEN_WIDTH + payload.len()`.
    pub fn append(&self, payload: &[u8]) -> io::Result<(u64, u64)> {
        let mut inner = self.inner.lock();
        ensure_open(&inner)?;

        let pos = inner.size;
        inner.writer.write_all(&(payload.len() as u64).to_be_bytes())?;
        inner.writer.write_all(payload)?;

        let written = LEN_WIDTH + payload.len() as u64;
        inner.size += written;
        log::trace!("store: appended {written} bytes at {pos}");
        Ok((written, pos))
    }

    /// Read the frame whose length prefix begins at `pos`.
    pub fn read(&self, pos: u64) -> io::Result<Vec<u8>> {
        let mut inner = self.inner.lock();
        ensure_open(&inner)?;
        inner.writer.flush()?;

        let file = inner.writer.get_ref();
        let mut len_buf = [0u8; LEN_WIDTH as usize];
        file.read_exact_at(&mut len_buf, pos)?;
        let len = u64::from_be_bytes(len_buf);

        let mut payload = vec![0u8; len as usize];
        file.read_exact_at(&mut payload, pos + LEN_WIDTH)?;
        Ok(payload)
    }

    /// Flush the write buffer and perform a positional read into `buf`,
    /// following the semantics of a POSIX `pread`: fewer bytes than
    /// `buf.len()` may be returned, e.g. at end of file, without that being
    /// an error.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let mut inner = self.inner.lock();
        ensure_open(&inner)?;
        inner.writer.flush()?;
        inner.writer.get_ref().read_at(buf, offset)
    }

    /// Current size of the store, in bytes.
    pub fn size(&self) -> u64 {
        self.inner.lock().size
    }

    /// Flush the write buffer and close the underlying file.
    ///
    /// Any further operation on the store fails.
    pub fn close(&self) -> io::Result<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Ok(());
        }
        inner.writer.flush()?;
        inner.closed = true;
        Ok(())
    }
}

fn ensure_open(inner: &Inner) -> io::Result<()> {
    if inner.closed {
        return Err(io::Error::new(io::ErrorKind::Other, "store is closed"));
    }
    Ok(())
}
