//! The log: an ordered list of segments, routing appends to the active
//! (last) segment and reads to whichever segment covers the requested
//! offset.
//!
//! All segment-list mutation goes through the log's write lock; reads take
//! the read lock only long enough to locate a segment or snapshot the list,
//! matching the concurrency model of the rest of the crate.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Error;
use crate::record::{Decode, Encode};
use crate::segment::{HasOffset, Segment, SegmentConfig};
use crate::store::Store;

/// Tunables for a log, read once at construction and applied to every
/// segment it creates.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub segment: SegmentConfig,
    /// Base offset for the first segment when starting from an empty
    /// directory.
    pub initial_offset: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            segment: SegmentConfig {
                max_store_bytes: 1024,
                max_index_bytes: 1024,
            },
            initial_offset: 0,
        }
    }
}

struct State {
    segments: Vec<Segment>,
}

impl State {
    fn active(&self) -> &Segment {
        self.segments.last().expect("log always has an active segment")
    }

    fn active_mut(&mut self) -> &mut Segment {
        self.segments.last_mut().expect("log always has an active segment")
    }
}

/// A persistent, segmented, append-only commit log rooted at a directory.
pub struct Log {
    dir: PathBuf,
    config: Config,
    state: RwLock<State>,
}

impl Log {
    /// Open (or recover) the log rooted at `dir` with `config`.
    pub fn open(dir: impl Into<PathBuf>, config: Config) -> Result<Self, Error> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let segments = recover_segments(&dir, config)?;
        Ok(Self {
            dir,
            config,
            state: RwLock::new(State { segments }),
        })
    }

    /// Append `record`, returning its assigned absolute offset.
    pub fn append<T>(&self, record: &mut T) -> Result<u64, Error>
    where
        T: Encode + HasOffset,
    {
        let mut state = self.state.write();
        let offset = state.active_mut().append(record)?;

        if state.active().is_maxed() {
            let new_base = offset + 1;
            let new_segment = Segment::open(&self.dir, new_base, self.config.segment)?;
            log::info!("log: rolled over to new segment at base_offset={new_base}");
            state.segments.push(new_segment);
        }

        Ok(offset)
    }

    /// Read and decode the record at absolute offset `off`.
    pub fn read<T: Decode>(&self, off: u64) -> Result<T, Error> {
        let state = self.state.read();
        let segment = find_segment(&state.segments, off).ok_or(Error::OffsetOutOfRange { offset: off })?;
        Ok(segment.read(off)?)
    }

    /// Base offset of the first segment.
    pub fn lowest_offset(&self) -> u64 {
        self.state.read().segments[0].base_offset()
    }

    /// Offset of the last appended record, or `0` on an empty log.
    pub fn highest_offset(&self) -> u64 {
        let state = self.state.read();
        let next = state.active().next_offset();
        next.saturating_sub(1)
    }

    /// Remove every segment that holds no offset greater than `lowest`.
    pub fn truncate(&self, lowest: u64) -> Result<(), Error> {
        let mut state = self.state.write();
        let mut retained = Vec::with_capacity(state.segments.len());
        for segment in std::mem::take(&mut state.segments) {
            if segment.next_offset() <= lowest + 1 {
                log::debug!("log: truncating segment base_offset={}", segment.base_offset());
                segment.remove(&self.dir)?;
            } else {
                retained.push(segment);
            }
        }
        state.segments = retained;
        if state.segments.is_empty() {
            let base = self.config.initial_offset;
            state.segments.push(Segment::open(&self.dir, base, self.config.segment)?);
        }
        Ok(())
    }

    /// Snapshot the segment list and return a byte stream over the whole
    /// log: the concatenation of every segment's store file, in
    /// base-offset order, each a sequence of length-prefixed frames.
    pub fn reader(&self) -> Reader {
        let state = self.state.read();
        let stores = state.segments.iter().map(Segment::store_handle).collect();
        Reader {
            stores,
            index: 0,
            cursor: 0,
        }
    }

    /// Close every segment. Further operations are not valid after this.
    pub fn close(&self) -> Result<(), Error> {
        let mut state = self.state.write();
        for segment in state.segments.iter_mut() {
            segment.close()?;
        }
        Ok(())
    }

    /// Close then delete the log's entire directory tree.
    pub fn remove(self) -> Result<(), Error> {
        self.close()?;
        std::fs::remove_dir_all(&self.dir)?;
        Ok(())
    }

    /// Remove the log then recreate it empty, in the same directory with
    /// the same config.
    pub fn reset(self) -> Result<Self, Error> {
        let dir = self.dir.clone();
        let config = self.config;
        self.remove()?;
        Log::open(dir, config)
    }

}

fn find_segment(segments: &[Segment], off: u64) -> Option<&Segment> {
    segments
        .binary_search_by(|s| {
            if off < s.base_offset() {
                std::cmp::Ordering::Greater
            } else if off >= s.next_offset() {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Equal
            }
        })
        .ok()
        .map(|i| &segments[i])
}

fn recover_segments(dir: &Path, config: Config) -> Result<Vec<Segment>, Error> {
    let mut base_offsets = BTreeSet::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if let Ok(base_offset) = stem.parse::<u64>() {
            base_offsets.insert(base_offset);
        }
    }

    let mut segments = Vec::with_capacity(base_offsets.len());
    for base_offset in base_offsets {
        segments.push(Segment::open(dir, base_offset, config.segment)?);
    }

    if segments.is_empty() {
        segments.push(Segment::open(dir, config.initial_offset, config.segment)?);
    }

    Ok(segments)
}

/// A byte stream over the whole log, suitable for replication: the
/// concatenation of every segment's store file in base-offset order.
pub struct Reader {
    stores: Vec<Arc<Store>>,
    index: usize,
    cursor: u64,
}

impl io::Read for Reader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let Some(store) = self.stores.get(self.index) else {
                return Ok(0);
            };
            let n = store.read_at(buf, self.cursor)?;
            if n > 0 {
                self.cursor += n as u64;
                return Ok(n);
            }
            // This store is exhausted; advance to the next one and retry.
            self.index += 1;
            self.cursor = 0;
        }
    }
}
