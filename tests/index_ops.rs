// Index engine scenarios against the real filesystem: merge/split behaviour,
// the on-disk encoding, persistence across close, and the single-window
// editing limit.

use std::path::PathBuf;

use sparsefile::{Dataset, ErrorKind, OpenMode, Range};
use tempfile::TempDir;

fn new_dataset() -> (TempDir, PathBuf, Dataset) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("set");
    let dataset = Dataset::open(&path, None, None, OpenMode::CreateNew).unwrap();
    (dir, path, dataset)
}

fn reopen(path: &PathBuf) -> Dataset {
    Dataset::open(path, None, None, OpenMode::ExistingReadWrite).unwrap()
}

fn entries(dataset: &mut Dataset) -> Vec<(u64, u64)> {
    dataset
        .index_entries()
        .unwrap()
        .into_iter()
        .map(|range| (range.offset, range.length))
        .collect()
}

// ── Merge / split build-up ────────────────────────────────────────────────────

#[test]
fn index_build_up_merges_across_reopens() {
    let (_dir, path, mut ds) = new_dataset();

    ds.index_add(Range::new(512, 128)).unwrap();
    ds.index_add(Range::new(1024, 512)).unwrap();
    assert_eq!(entries(&mut ds), vec![(512, 128), (1024, 512)]);

    // Filling the gap merges everything into one entry.
    ds.index_add(Range::new(640, 384)).unwrap();
    assert_eq!(entries(&mut ds), vec![(512, 1024)]);

    ds.close().unwrap();
    let mut ds = reopen(&path);
    assert_eq!(entries(&mut ds), vec![(512, 1024)]);

    // Overlap left, overlap right, superset, duplicate.
    ds.index_add(Range::new(256, 512)).unwrap();
    ds.index_add(Range::new(1024, 1024)).unwrap();
    ds.index_add(Range::new(128, 4096)).unwrap();
    ds.index_add(Range::new(1024, 512)).unwrap();
    assert_eq!(entries(&mut ds), vec![(128, 4096)]);

    // Split the single entry twice, then wipe everything.
    ds.index_remove(Range::new(1024, 1024)).unwrap();
    assert_eq!(entries(&mut ds), vec![(128, 896), (2048, 2176)]);
    ds.index_remove(Range::new(3000, 1)).unwrap();
    assert_eq!(entries(&mut ds), vec![(128, 896), (2048, 952), (3001, 1223)]);
    ds.index_remove(Range::new(256, 3072)).unwrap();
    assert_eq!(entries(&mut ds), vec![(128, 128), (3328, 896)]);

    ds.close().unwrap();
    let mut ds = reopen(&path);
    assert_eq!(entries(&mut ds), vec![(128, 128), (3328, 896)]);

    ds.index_remove(Range::new(128, 1_000_000)).unwrap();
    assert_eq!(entries(&mut ds), vec![]);
    ds.close().unwrap();

    let mut ds = reopen(&path);
    assert_eq!(entries(&mut ds), vec![]);
    ds.close().unwrap();
}

// ── On-disk encoding ──────────────────────────────────────────────────────────

#[test]
fn index_file_carries_the_delta_encoding() {
    let (_dir, path, mut ds) = new_dataset();
    ds.index_add(Range::new(0, 1)).unwrap();
    ds.index_add(Range::new(2, 1)).unwrap();
    ds.index_add(Range::new(5, 3)).unwrap();
    ds.close().unwrap();

    // Absolute offset 0, then gaps stored as the distance from the previous
    // entry's end minus one, lengths as length − 1.
    let index_path = path.with_extension("idx");
    assert_eq!(std::fs::read(index_path).unwrap(), [0x00, 0x00, 0x00, 0x00, 0x01, 0x02]);

    let mut ds = reopen(&path);
    assert_eq!(entries(&mut ds), vec![(0, 1), (2, 1), (5, 3)]);
    ds.close().unwrap();
}

#[test]
fn multi_byte_varints_round_trip_through_the_file() {
    let (_dir, path, mut ds) = new_dataset();
    ds.index_add(Range::new(128, 128)).unwrap();
    ds.index_add(Range::new(3328, 896)).unwrap();
    ds.close().unwrap();

    assert_eq!(
        std::fs::read(path.with_extension("idx")).unwrap(),
        [0x80, 0x01, 0x7f, 0xff, 0x17, 0xff, 0x06]
    );

    let mut ds = reopen(&path);
    assert_eq!(entries(&mut ds), vec![(128, 128), (3328, 896)]);
    ds.close().unwrap();
}

#[test]
fn malformed_index_files_are_rejected() {
    let (_dir, path, ds) = new_dataset();
    ds.close().unwrap();

    // A varint with nine continuation bytes is out of range.
    std::fs::write(path.with_extension("idx"), [0x80u8; 9]).unwrap();
    let mut ds = reopen(&path);
    let err = ds.index_entries().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidIndexFormat);
    ds.close().unwrap();

    // A file that ends in the middle of an entry is truncated.
    std::fs::write(path.with_extension("idx"), [0x00]).unwrap();
    let mut ds = reopen(&path);
    let err = ds.index_entries().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidIndexFormat);
    ds.close().unwrap();
}

// ── Editing in front of a long tail ──────────────────────────────────────────

#[test]
fn front_edits_shift_thousands_of_entries() {
    let (_dir, path, mut ds) = new_dataset();

    // Insert in descending order so every add rewrites the front of the
    // index and shifts the entire encoded tail.
    for i in (0..2000u64).rev() {
        ds.index_add(Range::new(i * 4, 2)).unwrap();
    }
    let all = entries(&mut ds);
    assert_eq!(all.len(), 2000);
    assert!(all.windows(2).all(|pair| pair[0].0 + pair[0].1 < pair[1].0));

    // Merge the first thousand entries into one.
    ds.index_add(Range::new(0, 4000)).unwrap();
    let all = entries(&mut ds);
    assert_eq!(all[0], (0, 4002));
    assert_eq!(all.len(), 1000);

    ds.close().unwrap();
    let mut ds = reopen(&path);
    assert_eq!(entries(&mut ds).len(), 1000);
    ds.close().unwrap();
}

// ── Single-window limit ───────────────────────────────────────────────────────

#[test]
fn edits_with_an_oversized_tail_fail_cleanly() {
    let (_dir, path, ds) = new_dataset();
    ds.close().unwrap();

    // 40,000 two-byte entries: (0,1), (2,1), (4,1), ... 80 KB of index,
    // more than the 64 KiB cache window.
    let mut index = Vec::with_capacity(80_000);
    for _ in 0..40_000 {
        index.push(0x00);
        index.push(0x00);
    }
    std::fs::write(path.with_extension("idx"), &index).unwrap();

    let mut ds = reopen(&path);

    // An edit at the front would have to shift the whole index through the
    // window; it must fail without corrupting anything.
    let err = ds.index_remove(Range::new(0, 1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IndexTooLarge);

    // An edit near the end only moves a short tail; the window re-anchors
    // and the edit succeeds.
    let last_offset = (40_000 - 1) * 2;
    ds.index_add(Range::new(last_offset, 10)).unwrap();

    let all = ds.index_entries().unwrap();
    assert_eq!(all.len(), 40_000);
    assert_eq!(all[0], Range::new(0, 1));
    assert_eq!(all[39_999], Range::new(last_offset, 10));
    ds.close().unwrap();
}

// ── Iterator invalidation ─────────────────────────────────────────────────────

#[test]
fn iterators_die_on_any_committed_mutation() {
    let (_dir, _path, mut ds) = new_dataset();

    // Even on an empty index: the revision moved, so the iterator is dead.
    let mut iter = ds.index_iter();
    ds.index_add(Range::new(512, 128)).unwrap();
    assert_eq!(iter.next(&mut ds).unwrap_err().kind(), ErrorKind::DeadIndexIterator);

    // A duplicate add changes no bytes but still commits.
    let mut iter = ds.index_iter();
    ds.index_add(Range::new(512, 128)).unwrap();
    assert_eq!(iter.next(&mut ds).unwrap_err().kind(), ErrorKind::DeadIndexIterator);

    // Removing an absent range changes no bytes but still commits.
    let mut iter = ds.index_iter();
    ds.index_remove(Range::new(10_000, 1)).unwrap();
    assert_eq!(iter.next(&mut ds).unwrap_err().kind(), ErrorKind::DeadIndexIterator);
    ds.close().unwrap();
}
