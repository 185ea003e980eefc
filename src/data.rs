//! Data-file operations: writing under a conflict policy, reads, and size
//! management.
//!
//! Writing and indexing are separate steps: [`Dataset::data_write`] never
//! touches the index, and a streaming caller commits the index entry once,
//! after the last piece succeeded. [`Dataset::data_add_range`] is the
//! composed form for callers that have the whole range in hand.

use std::io::SeekFrom;

use crate::backend::{Backend, BackendFile};
use crate::dataset::Dataset;
use crate::error::{Error, ErrorKind, Result};
use crate::range::Range;

/// Chunk size for comparing incoming bytes against existing data.
const COMPARE_BUF_SIZE: usize = 8 * 1024;

/// Policy for bytes that land on an offset already covered by the index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictMode {
    /// Compare byte-for-byte; any difference fails with `DataConflict`.
    Error,
    /// Leave the existing bytes in place and skip the incoming ones.
    KeepOld,
    /// Replace the existing bytes.
    Overwrite,
}

impl<B: Backend> Dataset<B> {
    /// Writes `data` at `range.offset`, resolving collisions with already
    /// present ranges according to `mode`. The write range is clamped to
    /// `data.len()` when the slice is shorter. The index is not modified.
    pub fn data_write(&mut self, range: Range, data: &[u8], mode: ConflictMode) -> Result<()> {
        self.ensure_writable()?;

        let mut iter = self.index_iter();
        let mut range = range;
        if (data.len() as u64) < range.length {
            range.length = data.len() as u64;
        }
        let mut data = &data[..range.length as usize];

        self.data_file
            .seek(SeekFrom::Start(range.offset))
            .map_err(|err| Error::io("seek", err))?;

        while !range.is_empty() {
            // Find the first entry that covers part of the remaining range.
            let mut hit = None;
            while let Some(entry) = iter.peek(self)? {
                if let Some(overlap) = entry.intersect(range) {
                    hit = Some(overlap);
                    break;
                }
                iter.skip(self)?;
            }

            // Everything up to that entry (or the whole rest) is new data.
            let new_len = match hit {
                Some(overlap) => overlap.offset - range.offset,
                None => range.length,
            };
            self.data_file
                .write_all(&data[..new_len as usize])
                .map_err(|err| Error::io("write", err))?;
            range = range.remove_left(new_len);
            data = &data[new_len as usize..];

            let overlap = match hit {
                Some(overlap) => overlap,
                None => {
                    debug_assert!(range.is_empty());
                    break;
                }
            };

            match mode {
                ConflictMode::KeepOld => {
                    self.data_file
                        .seek(SeekFrom::Current(overlap.length as i64))
                        .map_err(|err| Error::io("seek", err))?;
                }
                ConflictMode::Error => {
                    self.data_compare_existing(&data[..overlap.length as usize])?;
                }
                ConflictMode::Overwrite => {
                    self.data_file
                        .write_all(&data[..overlap.length as usize])
                        .map_err(|err| Error::io("write", err))?;
                }
            }
            range = range.remove_left(overlap.length);
            data = &data[overlap.length as usize..];
        }

        Ok(())
    }

    /// Reads from the data-file cursor and compares against `expected`,
    /// chunk by chunk, until every byte is compared or a mismatch is found.
    fn data_compare_existing(&mut self, mut expected: &[u8]) -> Result<()> {
        let mut buf = [0u8; COMPARE_BUF_SIZE];
        while !expected.is_empty() {
            let want = expected.len().min(buf.len());
            let n = self
                .data_file
                .read(&mut buf[..want])
                .map_err(|err| Error::io("read", err))?;
            if n == 0 {
                // The index says these bytes exist; the file disagrees.
                return Err(Error::new(ErrorKind::ReadOutOfBounds));
            }
            if buf[..n] != expected[..n] {
                return Err(Error::new(ErrorKind::DataConflict));
            }
            expected = &expected[n..];
        }
        Ok(())
    }

    /// Writes `data` and, only when the write succeeded, records the range
    /// in the index.
    pub fn data_add_range(&mut self, range: Range, data: &[u8], mode: ConflictMode) -> Result<()> {
        let mut range = range;
        if (data.len() as u64) < range.length {
            range.length = data.len() as u64;
        }
        self.data_write(range, data, mode)?;
        self.index_add(range)
    }

    /// Reads up to `buf.len()` bytes at `offset` without consulting the
    /// index; short reads are possible. Fails with `ReadOutOfBounds` only
    /// when `offset` lies past the end of the file.
    pub fn data_read(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let size = self.data_get_size()?;
        if offset > size {
            return Err(Error::new(ErrorKind::ReadOutOfBounds));
        }
        self.data_file
            .seek(SeekFrom::Start(offset))
            .map_err(|err| Error::io("seek", err))?;
        self.data_file.read(buf).map_err(|err| Error::io("read", err))
    }

    /// Reads `min(range.length, buf.len())` bytes of a fully present range,
    /// looping over partial reads. Fails with `ReadOutOfBounds` when the
    /// range is not covered by a single index entry (empty ranges excepted),
    /// or when the data file turns out shorter than the index claims.
    ///
    /// Returns the number of bytes read.
    pub fn data_read_range(&mut self, range: Range, buf: &mut [u8]) -> Result<usize> {
        if !self.index_contains(range)? {
            return Err(Error::new(ErrorKind::ReadOutOfBounds));
        }

        let mut range = range;
        if range.length > buf.len() as u64 {
            range.length = buf.len() as u64;
        }
        let total = range.length as usize;

        let mut filled = 0;
        while filled < total {
            let n = self.data_read(range.offset, &mut buf[filled..total])?;
            if n == 0 {
                return Err(Error::new(ErrorKind::ReadOutOfBounds));
            }
            range = range.remove_left(n as u64);
            filled += n;
        }
        Ok(total)
    }

    /// Size of the data file in bytes.
    pub fn data_get_size(&mut self) -> Result<u64> {
        self.data_file.seek(SeekFrom::End(0)).map_err(|err| Error::io("seek", err))
    }

    /// Truncates or extends the data file to `size`.
    ///
    /// Shrinking past present bytes is destructive: with `allow_destructive`
    /// the affected entries are removed from the index first (a no-op when
    /// nothing is present there); without it the call fails with
    /// `SizeTooSmall` and changes nothing.
    pub fn data_set_size(&mut self, size: u64, allow_destructive: bool) -> Result<()> {
        self.ensure_writable()?;

        let relevant = Range::max_from(size);
        if allow_destructive {
            self.index_remove(relevant)?;
        } else if self.index_contains_any(relevant)? {
            return Err(Error::new(ErrorKind::SizeTooSmall));
        }

        log::debug!("resizing data file to {} bytes", size);
        self.data_file.truncate(size).map_err(|err| Error::io("truncate", err))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
