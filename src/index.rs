//! Index iterator, editor, and the index half of the public API.
//!
//! The index is a sorted sequence of non-empty, non-overlapping,
//! non-adjacent ranges, delta-encoded on disk as `(gap, length − 1)` varint
//! pairs. This module provides:
//!
//! - [`IndexIter`], a forward cursor over decoded entries, bound to the
//!   dataset revision at which it was created;
//! - the index editor, an internal session that rewrites the contiguous
//!   run of entries affected by an add or remove;
//! - the index operations: [`Dataset::index_add`], [`Dataset::index_remove`],
//!   [`Dataset::index_find_offset`], [`Dataset::index_contains`],
//!   [`Dataset::index_contains_any`].
//!
//! Every committed edit increments the dataset revision, which invalidates
//! all previously created iterators, including iterators whose entries were
//! not touched by the edit.

use crate::backend::Backend;
use crate::cache::INDEX_CACHE_SIZE;
use crate::dataset::Dataset;
use crate::error::{Error, ErrorKind, Result};
use crate::range::Range;
use crate::varint;

/// How many bytes the iterator asks the cache to stage ahead of its cursor.
/// Plenty for one entry (two varints of at most eight bytes each).
const ITER_FILL_HINT: u64 = 1024;

/// Capacity of the editor's rewrite buffer. An edit touches at most three
/// entries (merged-left, the edit itself, re-encoded right neighbour).
const EDITOR_BUF_CAPACITY: usize = 40;

// ─────────────────────────────────────────────────────────────────────────────
// Iterator
// ─────────────────────────────────────────────────────────────────────────────

/// Forward cursor over index entries.
///
/// The iterator is a plain value; it borrows the dataset only while
/// fetching. Any committed index mutation invalidates it: the next fetch
/// fails with `DeadIndexIterator`.
#[derive(Clone, Copy, Debug)]
pub struct IndexIter {
    /// Byte position within the index file.
    index_offset: u64,
    /// End offset of the last decoded entry, 0 before the first.
    data_offset: u64,
    /// Dataset revision captured at creation.
    revision: u64,
}

impl<B: Backend> Dataset<B> {
    /// Starts an iterator at the beginning of the index.
    pub fn index_iter(&self) -> IndexIter {
        IndexIter { index_offset: 0, data_offset: 0, revision: self.revision }
    }
}

impl IndexIter {
    /// Whether the cursor sits at the end of the index.
    pub fn is_eof<B: Backend>(&self, dataset: &Dataset<B>) -> bool {
        debug_assert!(self.index_offset <= dataset.total_index_size);
        self.index_offset == dataset.total_index_size
    }

    /// Decodes the entry under the cursor and advances past it. `Ok(None)`
    /// at the end of the index.
    pub fn next<B: Backend>(&mut self, dataset: &mut Dataset<B>) -> Result<Option<Range>> {
        match self.read_entry(dataset)? {
            Some((next_offset, entry)) => {
                self.index_offset = next_offset;
                self.data_offset = entry.end();
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Decodes the entry under the cursor without advancing.
    pub fn peek<B: Backend>(&self, dataset: &mut Dataset<B>) -> Result<Option<Range>> {
        Ok(self.read_entry(dataset)?.map(|(_, entry)| entry))
    }

    /// Advances past the entry under the cursor, discarding it.
    pub fn skip<B: Backend>(&mut self, dataset: &mut Dataset<B>) -> Result<()> {
        self.next(dataset).map(drop)
    }

    /// Revision guard plus decode. Returns the cursor position after the
    /// entry alongside the entry itself.
    fn read_entry<B: Backend>(&self, dataset: &mut Dataset<B>) -> Result<Option<(u64, Range)>> {
        if self.revision != dataset.revision {
            return Err(Error::new(ErrorKind::DeadIndexIterator));
        }
        if self.index_offset == dataset.total_index_size {
            return Ok(None);
        }

        dataset.index_fill_cache(Range::new(self.index_offset, ITER_FILL_HINT))?;

        // The decoder must not see bytes past the logical index size: the
        // window can overshoot it when the file has not been truncated yet.
        let visible_end = dataset.cache.window.end().min(dataset.total_index_size);
        let avail = visible_end.saturating_sub(self.index_offset);
        let slice = dataset.cache.slice(Range::new(self.index_offset, avail));

        let mut pos = 0usize;
        let gap = varint::decode(slice, &mut pos)?;
        let len_minus_1 = varint::decode(slice, &mut pos)?;

        // The stored gap is one less than the distance: adjacency is
        // forbidden, so a distance of 1 encodes as 0. An entry reaching
        // past the end of the address space cannot have been written by the
        // editor and marks the index as malformed.
        let offset = if self.data_offset == 0 {
            Some(gap)
        } else {
            self.data_offset.checked_add(gap + 1)
        };
        let entry = match offset {
            Some(offset) if offset.checked_add(len_minus_1 + 1).is_some() => {
                Range::new(offset, len_minus_1 + 1)
            }
            _ => return Err(Error::new(ErrorKind::InvalidIndexFormat)),
        };
        Ok(Some((self.index_offset + pos as u64, entry)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Editor
// ─────────────────────────────────────────────────────────────────────────────

/// A rewrite session over the run of entries `[replace_start, replace_end)`.
///
/// Rewritten entries are collected re-encoded in a small buffer; `commit`
/// splices them into the cache in place of the replaced bytes, shifts the
/// tail of the index, and bumps the revision. Nothing is mutated until
/// `commit`, so a failed collection leaves iterators valid.
struct IndexEditor {
    buf: Vec<u8>,
    prev_entry_end: u64,
    replace_start: u64,
    replace_length: u64,
}

impl IndexEditor {
    fn new() -> Self {
        IndexEditor {
            buf: Vec::with_capacity(EDITOR_BUF_CAPACITY),
            prev_entry_end: 0,
            replace_start: 0,
            replace_length: 0,
        }
    }

    /// Fixes the left edge of the rewrite: the index byte position of the
    /// first affected entry and the data end offset of the entry before it
    /// (needed to keep the delta encoding correct across the cut).
    fn set_start(&mut self, replace_start: u64, prev_entry_end: u64) {
        self.replace_start = replace_start;
        self.prev_entry_end = prev_entry_end;
    }

    fn set_end(&mut self, replace_end: u64) {
        debug_assert!(self.replace_start <= replace_end);
        self.replace_length = replace_end - self.replace_start;
    }

    /// Appends one re-encoded entry. Fails with `IndexTooLarge` when the
    /// entry does not fit the rewrite buffer.
    fn push_entry(&mut self, entry: Range) -> Result<()> {
        let is_first = self.prev_entry_end == 0;
        debug_assert!(!entry.is_empty() && (entry.offset != 0 || is_first));

        let mut gap = entry.offset - self.prev_entry_end;
        if !is_first {
            gap -= 1;
        }

        let mut encoded = Vec::with_capacity(2 * varint::MAX_ENCODED_LEN);
        varint::encode_into(gap, &mut encoded);
        varint::encode_into(entry.length - 1, &mut encoded);
        if self.buf.len() + encoded.len() > EDITOR_BUF_CAPACITY {
            return Err(Error::new(ErrorKind::IndexTooLarge));
        }
        self.buf.extend_from_slice(&encoded);
        self.prev_entry_end = entry.end();
        Ok(())
    }

    /// Splices the collected bytes into the index in place of the replaced
    /// run, marks the rewritten region dirty, and invalidates iterators.
    fn commit<B: Backend>(self, dataset: &mut Dataset<B>) -> Result<()> {
        // The whole run from the cut to the end of the index moves; it must
        // be present in the window.
        let run = Range::new(self.replace_start, dataset.total_index_size - self.replace_start);
        dataset.index_fill_cache(run)?;

        let new_total =
            dataset.total_index_size + self.buf.len() as u64 - self.replace_length;
        if new_total - dataset.cache.window.offset > INDEX_CACHE_SIZE as u64 {
            return Err(Error::new(ErrorKind::IndexTooLarge));
        }

        let replaced = Range::new(self.replace_start, self.replace_length);
        let tail_len = dataset.total_index_size - replaced.end();
        dataset.cache.replace(replaced, &self.buf, tail_len);
        dataset.index_resize(new_total);
        dataset.cache.mark_dirty(Range::new(self.replace_start, new_total - self.replace_start));

        dataset.revision += 1;
        log::trace!(
            "index edit committed: replaced {} bytes at {} with {} ({} total)",
            self.replace_length,
            self.replace_start,
            self.buf.len(),
            new_total
        );
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Index operations
// ─────────────────────────────────────────────────────────────────────────────

/// Target of [`Dataset::index_find_offset`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FindMode {
    /// Find the first present byte at or after the start offset.
    Data,
    /// Find the first absent byte at or after the start offset.
    NoData,
}

impl<B: Backend> Dataset<B> {
    /// Marks `range` as present, merging with overlapping and adjacent
    /// entries. Adding an already-present range rewrites an identical
    /// sequence; it still counts as a mutation and invalidates iterators.
    /// Adding an empty range changes nothing and keeps iterators valid.
    pub fn index_add(&mut self, range: Range) -> Result<()> {
        self.ensure_writable()?;
        if range.is_empty() {
            return Ok(());
        }

        let mut iter = self.index_iter();
        let mut editor = IndexEditor::new();
        let mut merged = range;

        // Entries strictly left of the addition stay untouched; an entry
        // that ends exactly at the addition is adjacent and participates.
        while let Some(entry) = iter.peek(self)? {
            if entry.end() >= merged.offset {
                break;
            }
            iter.skip(self)?;
        }

        editor.set_start(iter.index_offset, iter.data_offset);

        // Absorb every entry the addition unions with.
        while let Some(entry) = iter.peek(self)? {
            match merged.union(entry) {
                Some(union) => {
                    merged = union;
                    iter.skip(self)?;
                }
                None => break,
            }
        }

        editor.push_entry(merged)?;

        // The entry after the merged region is re-encoded relative to the
        // new predecessor.
        if let Some(entry) = iter.next(self)? {
            editor.push_entry(entry)?;
        }

        editor.set_end(iter.index_offset);
        editor.commit(self)
    }

    /// Marks `range` as absent, trimming and splitting entries as needed.
    /// Removing an absent range rewrites an identical sequence; it still
    /// counts as a mutation and invalidates iterators.
    pub fn index_remove(&mut self, range: Range) -> Result<()> {
        self.ensure_writable()?;

        let mut iter = self.index_iter();
        let mut editor = IndexEditor::new();

        while let Some(entry) = iter.peek(self)? {
            if entry.end() >= range.offset {
                break;
            }
            iter.skip(self)?;
        }

        editor.set_start(iter.index_offset, iter.data_offset);

        while let Some(entry) = iter.peek(self)? {
            if !entry.overlaps(range) {
                break;
            }
            iter.skip(self)?;

            let (left, right) = entry.remove(range);
            // A left remainder can only come from the first overlapping
            // entry, a right remainder only from the last.
            if !left.is_empty() {
                editor.push_entry(left)?;
            }
            if !right.is_empty() {
                editor.push_entry(right)?;
            }
        }

        if let Some(entry) = iter.next(self)? {
            editor.push_entry(entry)?;
        }

        editor.set_end(iter.index_offset);
        editor.commit(self)
    }

    /// Finds the first present (`FindMode::Data`) or absent
    /// (`FindMode::NoData`) byte at or after `start`. `Ok(None)` when no
    /// such offset exists, which can only happen in `Data` mode.
    pub fn index_find_offset(&mut self, start: u64, mode: FindMode) -> Result<Option<u64>> {
        let mut iter = self.index_iter();
        while let Some(entry) = iter.next(self)? {
            if entry.offset > start {
                return Ok(Some(match mode {
                    FindMode::Data => entry.offset,
                    FindMode::NoData => start,
                }));
            } else if entry.contains(start) {
                return Ok(Some(match mode {
                    FindMode::Data => start,
                    FindMode::NoData => entry.end(),
                }));
            }
        }
        Ok(match mode {
            FindMode::Data => None,
            FindMode::NoData => Some(start),
        })
    }

    /// Whether `range` is entirely present. Because entries are neither
    /// overlapping nor adjacent, a contained range is always a subset of a
    /// single entry. An empty range is contained iff its offset does not
    /// exceed the data file size.
    pub fn index_contains(&mut self, range: Range) -> Result<bool> {
        if range.is_empty() {
            let size = self.data_get_size()?;
            return Ok(range.offset <= size);
        }

        let mut iter = self.index_iter();
        while let Some(entry) = iter.next(self)? {
            if entry.is_superset(range) {
                return Ok(true);
            }
            if entry.offset >= range.offset {
                break;
            }
        }
        Ok(false)
    }

    /// Whether any byte of `range` is present.
    pub fn index_contains_any(&mut self, range: Range) -> Result<bool> {
        let mut iter = self.index_iter();
        while let Some(entry) = iter.next(self)? {
            if entry.intersect(range).is_some() {
                return Ok(true);
            }
            if entry.offset >= range.end() {
                break;
            }
        }
        Ok(false)
    }

    /// Decodes the whole index into a vector, mainly for tests and tools.
    pub fn index_entries(&mut self) -> Result<Vec<Range>> {
        let mut entries = Vec::new();
        let mut iter = self.index_iter();
        while let Some(entry) = iter.next(self)? {
            entries.push(entry);
        }
        Ok(entries)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendFile, MemBackend};
    use crate::dataset::OpenMode;
    use std::path::Path;

    fn fresh() -> Dataset<MemBackend> {
        Dataset::open_with(MemBackend::new(), Path::new("set"), None, None, OpenMode::CreateNew)
            .unwrap()
    }

    fn with_index(index: &[u8]) -> Dataset<MemBackend> {
        let backend = MemBackend::new();
        backend.put(Path::new("set"), b"");
        backend.put(Path::new("set.idx"), index);
        Dataset::open_with(backend, Path::new("set"), None, None, OpenMode::ExistingReadWrite)
            .unwrap()
    }

    fn r(offset: u64, length: u64) -> Range {
        Range::new(offset, length)
    }

    #[test]
    fn iterator_decodes_the_delta_format() {
        // (0,1), (2,1), (5,3): absolute offset 0, then each gap stores the
        // distance from the previous entry's end minus one.
        let mut ds = with_index(&[0x00, 0x00, 0x00, 0x00, 0x01, 0x02]);
        assert_eq!(ds.index_entries().unwrap(), vec![r(0, 1), r(2, 1), r(5, 3)]);
        ds.close().unwrap();
    }

    #[test]
    fn iterator_peek_does_not_advance() {
        let mut ds = with_index(&[0x00, 0x00, 0x00, 0x00]);
        let mut iter = ds.index_iter();
        assert_eq!(iter.peek(&mut ds).unwrap(), Some(r(0, 1)));
        assert_eq!(iter.peek(&mut ds).unwrap(), Some(r(0, 1)));
        assert_eq!(iter.next(&mut ds).unwrap(), Some(r(0, 1)));
        assert_eq!(iter.next(&mut ds).unwrap(), Some(r(2, 1)));
        assert!(iter.is_eof(&ds));
        assert_eq!(iter.next(&mut ds).unwrap(), None);
        ds.close().unwrap();
    }

    #[test]
    fn iterator_rejects_truncated_entries() {
        // A lone continuation byte: the varint never ends.
        let mut ds = with_index(&[0x80]);
        let mut iter = ds.index_iter();
        let err = iter.next(&mut ds).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidIndexFormat);
        ds.close().unwrap();
    }

    #[test]
    fn iterator_rejects_missing_length_field() {
        // Gap only, no length varint.
        let mut ds = with_index(&[0x05]);
        let mut iter = ds.index_iter();
        let err = iter.next(&mut ds).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidIndexFormat);
        ds.close().unwrap();
    }

    #[test]
    fn add_merges_and_encodes_per_scenario() {
        let mut ds = fresh();
        ds.index_add(r(512, 128)).unwrap();
        assert_eq!(ds.index_entries().unwrap(), vec![r(512, 128)]);
        ds.index_add(r(1024, 512)).unwrap();
        assert_eq!(ds.index_entries().unwrap(), vec![r(512, 128), r(1024, 512)]);
        // Fill the gap.
        ds.index_add(r(640, 384)).unwrap();
        assert_eq!(ds.index_entries().unwrap(), vec![r(512, 1024)]);
        // Overlap left, overlap right, superset, duplicate.
        ds.index_add(r(256, 512)).unwrap();
        assert_eq!(ds.index_entries().unwrap(), vec![r(256, 1280)]);
        ds.index_add(r(1024, 1024)).unwrap();
        assert_eq!(ds.index_entries().unwrap(), vec![r(256, 1792)]);
        ds.index_add(r(128, 4096)).unwrap();
        assert_eq!(ds.index_entries().unwrap(), vec![r(128, 4096)]);
        ds.index_add(r(1024, 512)).unwrap();
        assert_eq!(ds.index_entries().unwrap(), vec![r(128, 4096)]);
        ds.close().unwrap();
    }

    #[test]
    fn remove_splits_and_trims_per_scenario() {
        let mut ds = fresh();
        ds.index_add(r(128, 4096)).unwrap();
        ds.index_remove(r(1024, 1024)).unwrap();
        assert_eq!(ds.index_entries().unwrap(), vec![r(128, 896), r(2048, 2176)]);
        ds.index_remove(r(3000, 1)).unwrap();
        assert_eq!(
            ds.index_entries().unwrap(),
            vec![r(128, 896), r(2048, 952), r(3001, 1223)]
        );
        ds.index_remove(r(256, 3072)).unwrap();
        assert_eq!(ds.index_entries().unwrap(), vec![r(128, 128), r(3328, 896)]);
        // Removing the same range again changes nothing.
        ds.index_remove(r(256, 3072)).unwrap();
        assert_eq!(ds.index_entries().unwrap(), vec![r(128, 128), r(3328, 896)]);
        ds.index_remove(r(128, 1_000_000)).unwrap();
        assert_eq!(ds.index_entries().unwrap(), vec![]);
        ds.index_remove(r(128, 1_000_000)).unwrap();
        assert_eq!(ds.index_entries().unwrap(), vec![]);
        ds.close().unwrap();
    }

    #[test]
    fn entries_stay_sorted_and_gapped() {
        let mut ds = fresh();
        for range in [r(10, 5), r(100, 1), r(0, 3), r(50, 20), r(16, 2), r(98, 1)] {
            ds.index_add(range).unwrap();
            let entries = ds.index_entries().unwrap();
            for pair in entries.windows(2) {
                assert!(pair[0].end() < pair[1].offset, "{} then {}", pair[0], pair[1]);
            }
            for entry in entries {
                assert!(!entry.is_empty());
            }
        }
        ds.close().unwrap();
    }

    #[test]
    fn any_mutation_kills_existing_iterators() {
        let mut ds = fresh();
        ds.index_add(r(512, 128)).unwrap();

        let mut before_add = ds.index_iter();
        ds.index_add(r(512, 128)).unwrap(); // identical bytes, still a mutation
        assert_eq!(before_add.next(&mut ds).unwrap_err().kind(), ErrorKind::DeadIndexIterator);

        let mut before_remove = ds.index_iter();
        ds.index_remove(r(0, 10)).unwrap(); // nothing removed, still a mutation
        assert_eq!(
            before_remove.next(&mut ds).unwrap_err().kind(),
            ErrorKind::DeadIndexIterator
        );
        ds.close().unwrap();
    }

    #[test]
    fn dead_iterator_fails_peek_and_skip_too() {
        let mut ds = fresh();
        let mut iter = ds.index_iter();
        ds.index_add(r(512, 128)).unwrap();
        assert_eq!(iter.peek(&mut ds).unwrap_err().kind(), ErrorKind::DeadIndexIterator);
        assert_eq!(iter.skip(&mut ds).unwrap_err().kind(), ErrorKind::DeadIndexIterator);
        ds.close().unwrap();
    }

    #[test]
    fn read_only_queries_keep_iterators_alive() {
        let mut ds = fresh();
        ds.index_add(r(512, 128)).unwrap();
        let mut iter = ds.index_iter();
        assert!(ds.index_contains(r(512, 128)).unwrap());
        assert!(ds.index_contains_any(r(0, 1024)).unwrap());
        assert_eq!(ds.index_find_offset(0, FindMode::Data).unwrap(), Some(512));
        assert_eq!(iter.next(&mut ds).unwrap(), Some(r(512, 128)));
        ds.close().unwrap();
    }

    #[test]
    fn overflowing_edit_aborts_before_commit() {
        // A split at huge offsets re-encodes three entries whose varints
        // total more than the 40-byte rewrite buffer. The edit must fail
        // cleanly: index unchanged, iterators still valid.
        const A: u64 = 1 << 50;
        let mut ds = fresh();
        ds.index_add(r(A, 3 * A)).unwrap();
        ds.index_add(r(5 * A, A)).unwrap();
        let before = ds.index_entries().unwrap();
        let mut iter = ds.index_iter();

        let err = ds.index_remove(r(3 * A, 5)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexTooLarge);
        assert_eq!(iter.next(&mut ds).unwrap(), Some(r(A, 3 * A)));
        assert_eq!(ds.index_entries().unwrap(), before);
        ds.close().unwrap();
    }

    #[test]
    fn contains_requires_a_single_covering_entry() {
        let mut ds = fresh();
        ds.index_add(r(128, 128)).unwrap();
        ds.index_add(r(3328, 896)).unwrap();
        assert!(ds.index_contains(r(128, 128)).unwrap());
        assert!(ds.index_contains(r(200, 50)).unwrap());
        assert!(!ds.index_contains(r(128, 129)).unwrap());
        // Spanning the gap between two entries is not containment.
        assert!(!ds.index_contains(r(128, 4096)).unwrap());
        ds.close().unwrap();
    }

    #[test]
    fn contains_empty_range_is_bounded_by_file_size() {
        let mut ds = fresh();
        ds.data_file.truncate(100).unwrap();
        assert!(ds.index_contains(r(0, 0)).unwrap());
        assert!(ds.index_contains(r(100, 0)).unwrap());
        assert!(!ds.index_contains(r(101, 0)).unwrap());
        ds.close().unwrap();
    }

    #[test]
    fn contains_any_detects_partial_overlap() {
        let mut ds = fresh();
        ds.index_add(r(128, 4096)).unwrap();
        assert!(!ds.index_contains_any(r(0, 128)).unwrap());
        assert!(ds.index_contains_any(r(0, 129)).unwrap());
        assert!(ds.index_contains_any(r(600, 1)).unwrap());
        assert!(ds.index_contains_any(r(4223, 1)).unwrap());
        assert!(!ds.index_contains_any(r(4224, 1)).unwrap());
        ds.close().unwrap();
    }

    #[test]
    fn find_offset_walks_entries_and_gaps() {
        let mut ds = fresh();
        ds.index_add(r(128, 128)).unwrap();
        ds.index_add(r(3328, 896)).unwrap();
        assert_eq!(ds.index_find_offset(0, FindMode::NoData).unwrap(), Some(0));
        assert_eq!(ds.index_find_offset(128, FindMode::NoData).unwrap(), Some(256));
        assert_eq!(ds.index_find_offset(300, FindMode::Data).unwrap(), Some(3328));
        assert_eq!(ds.index_find_offset(5000, FindMode::Data).unwrap(), None);
        assert_eq!(ds.index_find_offset(5000, FindMode::NoData).unwrap(), Some(5000));
        ds.close().unwrap();
    }

    #[test]
    fn edits_survive_flush_and_reopen() {
        let backend = MemBackend::new();
        let mut ds = Dataset::open_with(
            backend.clone(),
            Path::new("set"),
            None,
            None,
            OpenMode::CreateNew,
        )
        .unwrap();
        ds.index_add(r(0, 1)).unwrap();
        ds.index_add(r(2, 1)).unwrap();
        ds.index_add(r(5, 3)).unwrap();
        ds.close().unwrap();

        assert_eq!(
            backend.contents(Path::new("set.idx")).unwrap(),
            vec![0x00, 0x00, 0x00, 0x00, 0x01, 0x02]
        );

        let mut ds = Dataset::open_with(
            backend,
            Path::new("set"),
            None,
            None,
            OpenMode::ExistingReadWrite,
        )
        .unwrap();
        assert_eq!(ds.index_entries().unwrap(), vec![r(0, 1), r(2, 1), r(5, 3)]);
        ds.close().unwrap();
    }

    #[test]
    fn add_on_read_only_dataset_fails() {
        let backend = MemBackend::new();
        Dataset::open_with(backend.clone(), Path::new("set"), None, None, OpenMode::CreateNew)
            .unwrap()
            .close()
            .unwrap();
        let mut ds = Dataset::open_with(
            backend,
            Path::new("set"),
            None,
            None,
            OpenMode::ExistingReadOnly,
        )
        .unwrap();
        assert_eq!(
            ds.index_add(r(0, 1)).unwrap_err().kind(),
            ErrorKind::DatasetReadOnly
        );
        assert_eq!(
            ds.index_remove(r(0, 1)).unwrap_err().kind(),
            ErrorKind::DatasetReadOnly
        );
        ds.close().unwrap();
    }
}
