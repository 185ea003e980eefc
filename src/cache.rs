//! Write-back page cache for the index file.
//!
//! The cache is a single 64 KiB window mirroring a contiguous byte range of
//! the index file. Reads through the window avoid repeated small I/O while
//! decoding entries; edits are performed in the window and written back on
//! [`Dataset::index_flush`]. When the window is dirty, the dirty sub-range
//! is always contained in the window.
//!
//! The single-window design imposes a hard limit: an operation that needs a
//! run longer than the window fails with `IndexTooLarge` instead of
//! corrupting state.

use std::io::SeekFrom;

use crate::backend::{Backend, BackendFile};
use crate::dataset::Dataset;
use crate::error::{Error, ErrorKind, Result};
use crate::range::Range;

/// Size of the cache window in bytes.
pub const INDEX_CACHE_SIZE: usize = 64 * 1024;

// ─────────────────────────────────────────────────────────────────────────────
// IndexCache
// ─────────────────────────────────────────────────────────────────────────────

/// The in-memory half of the cache: buffer, window placement, dirty range.
/// The I/O half (filling and flushing) lives on [`Dataset`], which owns the
/// index file handle.
#[derive(Debug)]
pub struct IndexCache {
    buf: Box<[u8]>,
    /// Byte range of the index file currently mirrored by `buf`.
    pub(crate) window: Range,
    /// Sub-range of `window` that differs from the file, if any.
    pub(crate) dirty: Option<Range>,
}

impl IndexCache {
    pub(crate) fn new() -> Self {
        IndexCache {
            buf: vec![0u8; INDEX_CACHE_SIZE].into_boxed_slice(),
            window: Range::new(0, 0),
            dirty: None,
        }
    }

    /// Borrow the cached bytes for `range`, which must be inside the window.
    pub(crate) fn slice(&self, range: Range) -> &[u8] {
        debug_assert!(self.window.is_superset(range));
        let start = (range.offset - self.window.offset) as usize;
        &self.buf[start..start + range.length as usize]
    }

    /// Record that `range` now differs from the on-disk index. `range` must
    /// be inside the window.
    pub(crate) fn mark_dirty(&mut self, range: Range) {
        self.dirty = Some(match self.dirty {
            Some(dirty) => dirty.outer(range),
            None => range,
        });
        debug_assert!(self.window.is_superset(self.dirty.unwrap()));
    }

    /// Replaces `replaced` with `insert`, shifting the `tail_len` bytes that
    /// follow `replaced` to sit directly after the inserted bytes. The
    /// caller has verified that the result fits in the window buffer.
    pub(crate) fn replace(&mut self, replaced: Range, insert: &[u8], tail_len: u64) {
        debug_assert!(self.window.is_superset(Range::new(replaced.offset, replaced.length + tail_len)));
        let start = (replaced.offset - self.window.offset) as usize;
        let old_end = start + replaced.length as usize;
        let new_end = start + insert.len();
        debug_assert!(new_end + tail_len as usize <= self.buf.len());
        self.buf.copy_within(old_end..old_end + tail_len as usize, new_end);
        self.buf[start..new_end].copy_from_slice(insert);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// I/O half: fill, resize, flush
// ─────────────────────────────────────────────────────────────────────────────

impl<B: Backend> Dataset<B> {
    /// Positions the index file cursor, skipping the syscall when it is
    /// already there.
    pub(crate) fn set_index_pos(&mut self, offset: u64) -> Result<()> {
        if self.index_pos != offset {
            self.index_file
                .seek(SeekFrom::Start(offset))
                .map_err(|err| Error::io("seek", err))?;
            self.index_pos = offset;
        }
        Ok(())
    }

    /// Ensures `range` (clamped to the logical index size) is present in the
    /// cache window.
    ///
    /// If the range does not fit in the window from its current origin, the
    /// window is flushed and re-anchored at `range.offset`. Reads extend the
    /// window by whatever the file yields; a file shorter than the logical
    /// index size leaves the window short, and the decoder reports the
    /// truncation.
    pub(crate) fn index_fill_cache(&mut self, range: Range) -> Result<()> {
        let range = match range.intersect(Range::new(0, self.total_index_size)) {
            Some(range) => range,
            None => return Ok(()),
        };

        if self.cache.window.is_superset(range) {
            return Ok(());
        }

        if range.length > INDEX_CACHE_SIZE as u64 {
            return Err(Error::new(ErrorKind::IndexTooLarge));
        }

        // Re-anchor when the range cannot fit starting from the current
        // window origin.
        let reachable = Range::new(self.cache.window.offset, INDEX_CACHE_SIZE as u64);
        if !reachable.is_superset(range) {
            self.index_flush()?;
            self.cache.window = Range::new(range.offset, 0);
        }

        while self.cache.window.end() < range.end() {
            let filled = self.cache.window.length as usize;
            self.set_index_pos(self.cache.window.end())?;
            let n = self
                .index_file
                .read(&mut self.cache.buf[filled..INDEX_CACHE_SIZE])
                .map_err(|err| Error::io("read", err))?;
            if n == 0 {
                break;
            }
            self.index_pos += n as u64;
            self.cache.window.length += n as u64;
        }

        Ok(())
    }

    /// Updates the authoritative index length after an edit and trims the
    /// window (and dirty range) to the new end.
    pub(crate) fn index_resize(&mut self, new_size: u64) {
        debug_assert!(self.cache.window.offset <= new_size);
        self.total_index_size = new_size;
        self.cache.window.length = new_size - self.cache.window.offset;
        if let Some(dirty) = self.cache.dirty {
            self.cache.dirty = dirty.intersect(self.cache.window);
        }
    }

    /// Writes the dirty part of the window back to the index file. No-op
    /// when the window is clean.
    ///
    /// When the logical index size differs from the size on disk, the file
    /// is truncated first, so that a shrinking index never leaves stale
    /// bytes past its new end.
    pub fn index_flush(&mut self) -> Result<()> {
        let dirty = match self.cache.dirty {
            Some(dirty) => dirty,
            None => return Ok(()),
        };

        self.set_index_pos(dirty.offset)?;

        if self.index_size_on_disk != self.total_index_size {
            self.index_file
                .truncate(self.total_index_size)
                .map_err(|err| Error::io("truncate", err))?;
            self.index_size_on_disk = self.total_index_size;
        }

        self.index_file
            .write_all(self.cache.slice(dirty))
            .map_err(|err| Error::io("write", err))?;
        self.index_pos += dirty.length;
        self.cache.dirty = None;

        log::trace!("flushed index bytes {} ({} bytes on disk)", dirty, self.index_size_on_disk);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
