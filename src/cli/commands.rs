//! Implementations of the seven subcommands.
//!
//! Each command opens the dataset, runs its body, and closes the dataset
//! even when the body failed; the body's error takes precedence over a
//! close error. Raw-output commands (`read`, `get-index`) put stdout into
//! binary mode on Windows.

use std::fs::File;
use std::io::{self, Read, Write};

use anyhow::{bail, Context};

use crate::cli::{
    AddArgs, CreateArgs, DatasetArgs, FindOffsetArgs, GetIndexArgs, ListRangesArgs, RangeFormat,
    ReadArgs, SetSizeArgs, EXIT_NO_RESULT, EXIT_SUCCESS,
};
use crate::data::ConflictMode;
use crate::dataset::{Dataset, OpenMode};
use crate::index::FindMode;
use crate::range::Range;
use crate::varint;

/// Chunk size for streaming sources and reads.
const STREAM_BUF_SIZE: usize = 64 * 1024;

/// Runs `body` against an open dataset and closes the dataset afterwards.
/// Close always runs; the body's error wins over a close error.
fn with_dataset(
    paths: &DatasetArgs,
    mode: OpenMode,
    body: impl FnOnce(&mut Dataset) -> anyhow::Result<i32>,
) -> anyhow::Result<i32> {
    let mut dataset = paths.open(mode)?;
    let result = body(&mut dataset);
    let closed = dataset.close().context("cannot close dataset");
    match (result, closed) {
        (Ok(code), Ok(())) => Ok(code),
        (Err(err), _) => Err(err),
        (Ok(_), Err(err)) => Err(err),
    }
}

/// Prevents Windows from translating `\n` in raw output; a no-op elsewhere.
fn set_stdout_binary() {
    #[cfg(windows)]
    // SAFETY: changing the mode of stdout (fd 1) is always valid.
    unsafe {
        libc::_setmode(1, libc::O_BINARY);
    }
}

// ── create ────────────────────────────────────────────────────────────────────

pub fn create(args: &CreateArgs) -> anyhow::Result<i32> {
    with_dataset(&args.paths, OpenMode::CreateNew, |dataset| {
        if let Some(size) = args.size {
            dataset.data_set_size(size, false)?;
        }
        Ok(EXIT_SUCCESS)
    })
}

// ── add ───────────────────────────────────────────────────────────────────────

pub fn add(args: &AddArgs) -> anyhow::Result<i32> {
    // The source is opened before the dataset so that a missing source does
    // not touch the lock.
    let mut source: Box<dyn Read> = match args.source.as_deref() {
        None | Some("-") => Box::new(io::stdin().lock()),
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("cannot open source {path}"))?,
        ),
    };
    with_dataset(&args.paths, OpenMode::OpenOrCreate, |dataset| {
        stream_add(dataset, source.as_mut(), args)
    })
}

fn stream_add(
    dataset: &mut Dataset,
    source: &mut dyn Read,
    args: &AddArgs,
) -> anyhow::Result<i32> {
    let mode = ConflictMode::from(args.on_conflict);
    let mut buffer = vec![0u8; STREAM_BUF_SIZE];
    let mut length: u64 = 0;

    loop {
        let n = match source.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err).context("cannot read source"),
        };
        // Data first, index later: the entry is added only once the whole
        // source has arrived, so a short or failing source leaves the index
        // untouched.
        dataset.data_write(Range::new(args.offset + length, n as u64), &buffer[..n], mode)?;
        length += n as u64;
    }

    if let Some(expected) = args.enforce_length {
        if length != expected {
            bail!("source is {length} bytes long, expected {expected}");
        }
    }

    if length != 0 {
        dataset.index_add(Range::new(args.offset, length))?;
    }
    Ok(EXIT_SUCCESS)
}

// ── set-size ──────────────────────────────────────────────────────────────────

pub fn set_size(args: &SetSizeArgs) -> anyhow::Result<i32> {
    with_dataset(&args.paths, OpenMode::ExistingReadWrite, |dataset| {
        dataset.data_set_size(args.size, args.force)?;
        Ok(EXIT_SUCCESS)
    })
}

// ── read ──────────────────────────────────────────────────────────────────────

pub fn read(args: &ReadArgs) -> anyhow::Result<i32> {
    with_dataset(&args.paths, OpenMode::ExistingReadOnly, |dataset| {
        let length = match args.length {
            Some(length) => length,
            None => {
                // Read up to the next gap. A no-data offset always exists
                // at or after the start, so the fallback is never taken.
                let end = dataset
                    .index_find_offset(args.offset, FindMode::NoData)?
                    .unwrap_or(args.offset);
                end - args.offset
            }
        };

        let mut remaining = Range::new(args.offset, length);
        if let Some(limit) = args.limit {
            remaining.length = remaining.length.min(limit);
        }

        set_stdout_binary();
        let mut stdout = io::stdout().lock();
        let mut buffer = vec![0u8; STREAM_BUF_SIZE];
        while !remaining.is_empty() {
            let n = dataset.data_read_range(remaining, &mut buffer)?;
            stdout.write_all(&buffer[..n]).context("cannot write to stdout")?;
            remaining = remaining.remove_left(n as u64);
        }
        stdout.flush().context("cannot write to stdout")?;
        Ok(EXIT_SUCCESS)
    })
}

// ── find-offset ───────────────────────────────────────────────────────────────

pub fn find_offset(args: &FindOffsetArgs) -> anyhow::Result<i32> {
    with_dataset(&args.paths, OpenMode::ExistingReadOnly, |dataset| {
        match dataset.index_find_offset(args.start_at, args.stop_at.into())? {
            Some(offset) => {
                println!("{offset}");
                Ok(EXIT_SUCCESS)
            }
            None => Ok(EXIT_NO_RESULT),
        }
    })
}

// ── list-ranges ───────────────────────────────────────────────────────────────

pub fn list_ranges(args: &ListRangesArgs) -> anyhow::Result<i32> {
    with_dataset(&args.paths, OpenMode::ExistingReadOnly, |dataset| {
        let mut stdout = io::stdout().lock();
        if args.missing {
            list_missing_ranges(dataset, args.range_format, &mut stdout)?;
        } else {
            list_present_ranges(dataset, args.range_format, &mut stdout)?;
        }
        Ok(EXIT_SUCCESS)
    })
}

fn print_range(out: &mut impl Write, format: RangeFormat, range: Range) -> io::Result<()> {
    match format {
        RangeFormat::Inclusive => writeln!(out, "{}..{}", range.offset, range.end() - 1),
        RangeFormat::Exclusive => writeln!(out, "{}...{}", range.offset, range.end()),
    }
}

fn list_present_ranges(
    dataset: &mut Dataset,
    format: RangeFormat,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let mut iter = dataset.index_iter();
    while let Some(entry) = iter.next(dataset)? {
        print_range(out, format, entry).context("cannot write to stdout")?;
    }
    Ok(())
}

fn list_missing_ranges(
    dataset: &mut Dataset,
    format: RangeFormat,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let total_size = dataset.data_get_size()?;
    let mut prev_end = 0;

    let mut iter = dataset.index_iter();
    while let Some(entry) = iter.next(dataset)? {
        if entry.offset != 0 {
            print_range(out, format, Range::new(prev_end, entry.offset - prev_end))
                .context("cannot write to stdout")?;
        }
        prev_end = entry.end();
    }

    if prev_end < total_size {
        print_range(out, format, Range::new(prev_end, total_size - prev_end))
            .context("cannot write to stdout")?;
    }
    Ok(())
}

// ── get-index ─────────────────────────────────────────────────────────────────

pub fn get_index(args: &GetIndexArgs) -> anyhow::Result<i32> {
    with_dataset(&args.paths, OpenMode::ExistingReadOnly, |dataset| {
        let mut encoded = Vec::new();
        let mut prev_end: u64 = 0;

        let mut iter = dataset.index_iter();
        while let Some(entry) = iter.next(dataset)? {
            if entry.length < args.min_range_length {
                continue;
            }
            // Gaps are re-derived from the last *emitted* entry, so the
            // stream stays well-formed when short ranges are filtered out.
            let is_first = prev_end == 0;
            let mut gap = entry.offset - prev_end;
            if !is_first {
                gap -= 1;
            }
            varint::encode_into(gap, &mut encoded);
            varint::encode_into(entry.length - 1, &mut encoded);
            prev_end = entry.end();
        }

        set_stdout_binary();
        let mut stdout = io::stdout().lock();
        stdout.write_all(&encoded).context("cannot write to stdout")?;
        stdout.flush().context("cannot write to stdout")?;
        Ok(EXIT_SUCCESS)
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
