//! The fixed-width, memory-mapped index mapping a segment's relative
//! offsets to byte positions in its store.
//!
//! Entries are `rel_off:u32-be || pos:u64-be`, 12 bytes each. The backing
//! file is pre-grown to its configured capacity so the index can be
//! memory-mapped for O(1) random access; [`Index::close`] truncates it back
//! down to the bytes actually written, which is what lets a later
//! [`Index::open`] recover the exact entry count from the file's length.

use std::fs::File;
use std::io;
use std::path::Path;

use memmap2::MmapMut;

use crate::error::IndexError;

/// Width, in bytes, of a single index entry.
pub const ENTRY_WIDTH: u64 = 4 + 8;

#[derive(Debug)]
pub struct Index {
    file: File,
    mmap: MmapMut,
    /// Bytes of valid entries written so far; always a multiple of [`ENTRY_WIDTH`].
    size: u64,
    /// Capacity the backing file was pre-grown to.
    cap: u64,
}

impl Index {
    /// Open (creating if needed) the index file at `path`, pre-growing it
    /// to `cap` bytes and memory-mapping it.
    ///
    /// If the file already existed from a prior clean close, its length
    /// (which holds only valid entries, per [`Index::close`]) is taken as
    /// the recovered entry count before the file is grown back to `cap`.
    pub fn open(path: impl AsRef<Path>, cap: u64) -> io::Result<Self> {
        let file = File::options().read(true).write(true).create(true).open(path.as_ref())?;
        let size = file.metadata()?.len();
        file.set_len(cap)?;
        // SAFETY: `file` outlives the mapping and is not concurrently
        // truncated by another process; the log serializes all index
        // mutation through its own write lock.
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        log::debug!(
            "index: opened {} (recovered size {}, capacity {})",
            path.as_ref().display(),
            size,
            cap
        );
        Ok(Self { file, mmap, size, cap })
    }

    /// Number of valid bytes written (`entry_count * ENTRY_WIDTH`).
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Append a new entry. Fails with [`IndexError::NoSpace`] if the
    /// pre-grown file has no remaining slot.
    pub fn write(&mut self, rel_off: u32, pos: u64) -> Result<(), IndexError> {
        if self.size + ENTRY_WIDTH > self.cap {
            return Err(IndexError::NoSpace);
        }
        let start = self.size as usize;
        self.mmap[start..start + 4].copy_from_slice(&rel_off.to_be_bytes());
        self.mmap[start + 4..start + 12].copy_from_slice(&pos.to_be_bytes());
        self.size += ENTRY_WIDTH;
        Ok(())
    }

    /// Read the entry at index `i`. Negative `i` resolves to the last
    /// valid entry (`i == -1` is the recovery probe). Fails with
    /// [`IndexError::Eof`] if no valid entry exists at that index,
    /// including on an empty index.
    pub fn read(&self, i: i64) -> Result<(u32, u64), IndexError> {
        let entry_count = (self.size / ENTRY_WIDTH) as i64;
        let idx = if i < 0 { entry_count + i } else { i };
        if idx < 0 || idx >= entry_count {
            return Err(IndexError::Eof);
        }

        let start = idx as u64 * ENTRY_WIDTH;
        let start = start as usize;
        let rel_off = u32::from_be_bytes(self.mmap[start..start + 4].try_into().expect("4-byte slice"));
        let pos = u64::from_be_bytes(self.mmap[start + 4..start + 12].try_into().expect("8-byte slice"));
        Ok((rel_off, pos))
    }

    /// Flush the mapping, truncate the file to the bytes actually written,
    /// and sync it to disk.
    pub fn close(&mut self) -> io::Result<()> {
        self.mmap.flush()?;
        self.file.set_len(self.size)?;
        self.file.sync_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_then_read_back() {
        let dir = tempdir().unwrap();
        let mut index = Index::open(dir.path().join("0.index"), 1024).unwrap();

        index.write(0, 0).unwrap();
        index.write(1, 19).unwrap();

        assert_eq!(index.read(0).unwrap(), (0, 0));
        assert_eq!(index.read(1).unwrap(), (1, 19));
        assert_eq!(index.size(), ENTRY_WIDTH * 2);
    }

    #[test]
    fn negative_index_reads_last_entry() {
        let dir = tempdir().unwrap();
        let mut index = Index::open(dir.path().join("0.index"), 1024).unwrap();

        index.write(0, 0).unwrap();
        index.write(1, 19).unwrap();
        index.write(2, 42).unwrap();

        assert_eq!(index.read(-1).unwrap(), (2, 42));
    }

    #[test]
    fn empty_index_is_eof_even_at_minus_one() {
        let dir = tempdir().unwrap();
        let index = Index::open(dir.path().join("0.index"), 1024).unwrap();
        assert!(matches!(index.read(-1), Err(IndexError::Eof)));
        assert!(matches!(index.read(0), Err(IndexError::Eof)));
    }

    #[test]
    fn write_fails_once_capacity_exhausted() {
        let dir = tempdir().unwrap();
        let mut index = Index::open(dir.path().join("0.index"), ENTRY_WIDTH).unwrap();

        index.write(0, 0).unwrap();
        assert!(matches!(index.write(1, 12), Err(IndexError::NoSpace)));
    }

    #[test]
    fn close_then_reopen_recovers_entry_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0.index");

        {
            let mut index = Index::open(&path, 1024).unwrap();
            index.write(0, 0).unwrap();
            index.write(1, 19).unwrap();
            index.close().unwrap();
        }

        // The file should now hold exactly the written bytes, not the full
        // pre-grown capacity.
        assert_eq!(std::fs::metadata(&path).unwrap().len(), ENTRY_WIDTH * 2);

        let index = Index::open(&path, 1024).unwrap();
        assert_eq!(index.size(), ENTRY_WIDTH * 2);
        assert_eq!(index.read(-1).unwrap(), (1, 19));
    }
}
