//! Storage engine for sparsely populated byte files.
//!
//! A *dataset* is a logical file of up to 2^64 bytes in which only some
//! disjoint byte ranges are present. It is stored as two physical files: a
//! sparse **data file** holding raw bytes at their logical offsets, and an
//! **index file** holding a compact, sorted list of the present ranges. A
//! zero-byte **lock file** provides mutual exclusion between processes.
//!
//! ```no_run
//! use sparsefile::{ConflictMode, Dataset, OpenMode, Range};
//!
//! # fn main() -> sparsefile::Result<()> {
//! let mut ds = Dataset::open("video.bin".as_ref(), None, None, OpenMode::CreateNew)?;
//! ds.data_add_range(Range::new(4096, 4), b"8640", ConflictMode::Error)?;
//! let mut buf = [0u8; 4];
//! ds.data_read_range(Range::new(4096, 4), &mut buf)?;
//! ds.close()?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cache;
pub mod cli;
pub mod data;
pub mod dataset;
pub mod error;
pub mod index;
pub mod range;
pub mod varint;

pub use backend::{Backend, BackendFile, FileMode, FsBackend, MemBackend};
pub use cache::INDEX_CACHE_SIZE;
pub use data::ConflictMode;
pub use dataset::{Dataset, OpenMode, INDEX_EXTENSION, LOCK_EXTENSION};
pub use error::{Error, ErrorKind, Result};
pub use index::{FindMode, IndexIter};
pub use range::Range;
