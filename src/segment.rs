//! A segment pairs one store and one index under a base offset.
//!
//! The segment is where the log's offset arithmetic lives: it turns an
//! absolute offset into a relative one for the index, and turns the index's
//! `(rel_off, pos)` pair back into an absolute offset and a store position.

use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::SegmentError;
use crate::index::{Index, ENTRY_WIDTH};
use crate::record::{Decode, Encode};
use crate::store::Store;

/// Per-segment size caps, read at segment-creation time.
#[derive(Debug, Clone, Copy)]
pub struct SegmentConfig {
    pub max_store_bytes: u64,
    pub max_index_bytes: u64,
}

/// A `(store, index)` pair covering a contiguous range of absolute offsets
/// starting at `base_offset`.
#[derive(Debug)]
pub struct Segment {
    store: Arc<Store>,
    index: Index,
    base_offset: u64,
    next_offset: u64,
    config: SegmentConfig,
}

impl Segment {
    /// Open (or create) the segment rooted at `base_offset` inside `dir`,
    /// recovering `next_offset` by probing the index's last entry.
    pub fn open(dir: &Path, base_offset: u64, config: SegmentConfig) -> Result<Self, SegmentError> {
        let store_path = store_path(dir, base_offset);
        let store_file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .mode(0o644)
            .open(&store_path)?;
        let store = Arc::new(Store::open(store_file)?);

        let index_path = index_path(dir, base_offset);
        // Index files use mode 0664.
        let index = Index::open(&index_path, config.max_index_bytes)?;
        set_mode(&index_path, 0o664)?;

        let next_offset = match index.read(-1) {
            Ok((rel_off, _pos)) => base_offset + rel_off as u64 + 1,
            Err(crate::error::IndexError::Eof) => base_offset,
            Err(e) => return Err(e.into()),
        };

        log::debug!("segment: opened base_offset={base_offset} next_offset={next_offset}");
        Ok(Self {
            store,
            index,
            base_offset,
            next_offset,
            config,
        })
    }

    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    /// Encode `record` via its codec, stamping `record.offset = next_offset`
    /// before encoding, and append it to the store and index. Returns the
    /// assigned absolute offset.
    pub fn append<T>(&mut self, record: &mut T) -> Result<u64, SegmentError>
    where
        T: Encode + HasOffset,
    {
        let offset = self.next_offset;
        record.set_offset(offset);

        let mut buf = Vec::new();
        record.encode(&mut buf);

        let (_written, pos) = self.store.append(&buf)?;
        let rel_off = (offset - self.base_offset) as u32;
        self.index.write(rel_off, pos)?;

        self.next_offset += 1;
        Ok(offset)
    }

    /// Read and decode the record stored at absolute offset `off`.
    pub fn read<T: Decode>(&self, off: u64) -> Result<T, SegmentError> {
        if off < self.base_offset || off >= self.next_offset {
            return Err(SegmentError::OffsetOutOfRange { offset: off });
        }
        let rel_off = (off - self.base_offset) as i64;
        let (_rel_off, pos) = self.index.read(rel_off)?;
        let buf = self.store.read(pos)?;
        T::decode(&buf).map_err(|source| SegmentError::Decode { offset: off, source })
    }

    /// True once either the store or the index has reached its configured
    /// cap; either bound triggers rollover.
    pub fn is_maxed(&self) -> bool {
        self.store.size() >= self.config.max_store_bytes || self.index.size() >= self.config.max_index_bytes
    }

    /// Close the index (so its truncate-on-close runs before the files are
    /// dropped) then the store.
    pub fn close(&mut self) -> std::io::Result<()> {
        self.index.close()?;
        self.store.close()
    }

    /// Close then delete both backing files.
    pub fn remove(mut self, dir: &Path) -> std::io::Result<()> {
        self.close()?;
        std::fs::remove_file(store_path(dir, self.base_offset))?;
        std::fs::remove_file(index_path(dir, self.base_offset))?;
        Ok(())
    }

    /// A cheaply-cloned handle to the underlying store, for the whole-log
    /// byte stream reader: the handle outlives the log's read lock since
    /// the store serializes its own access internally.
    pub fn store_handle(&self) -> Arc<Store> {
        Arc::clone(&self.store)
    }
}

/// A record type that can carry the offset the log assigns it on append.
pub trait HasOffset {
    fn set_offset(&mut self, offset: u64);
}

impl HasOffset for crate::record::Record {
    fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
    }
}

pub(crate) fn store_path(dir: &Path, base_offset: u64) -> PathBuf {
    dir.join(format!("{base_offset}.store"))
}

pub(crate) fn index_path(dir: &Path, base_offset: u64) -> PathBuf {
    dir.join(format!("{base_offset}.index"))
}

fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt as _;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(mode);
    std::fs::set_permissions(path, perms)
}
