//! Platform I/O façade.
//!
//! The engine performs all file access through the [`Backend`] /
//! [`BackendFile`] trait pair so that it can run unchanged against the real
//! filesystem ([`FsBackend`]) or an in-memory store ([`MemBackend`]) in
//! tests. The façade is narrow: open in one of three per-file modes, seek,
//! read-up-to-N, write-all, truncate, unlink, and the exclusive creation of
//! the zero-byte lock file.
//!
//! Primitives return plain [`io::Result`]; call sites map failures to
//! [`crate::error::Error`] with the label of the failing primitive.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

// ─────────────────────────────────────────────────────────────────────────────
// Traits
// ─────────────────────────────────────────────────────────────────────────────

/// Per-file open disposition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileMode {
    /// Open an existing file for reading.
    ReadOnly,
    /// Open an existing file for reading and writing.
    ReadWrite,
    /// Create a new file for reading and writing; fail if it exists.
    CreateNew,
}

/// An open file handle.
pub trait BackendFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64>;

    /// Reads up to `buf.len()` bytes. Short reads are allowed; zero bytes
    /// means end of file.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes the entire buffer, retrying on short writes.
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Sets the file length. Extending fills with zeros; the cursor is left
    /// where it was.
    fn truncate(&mut self, size: u64) -> io::Result<()>;
}

/// A store that can open, create, and remove files by path.
pub trait Backend {
    type File: BackendFile;

    fn open(&self, path: &Path, mode: FileMode) -> io::Result<Self::File>;

    /// Creates the zero-byte lock file exclusively, with no access
    /// permissions. The handle is not retained; only the file's presence
    /// matters.
    fn create_lock(&self, path: &Path) -> io::Result<()>;

    fn unlink(&self, path: &Path) -> io::Result<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Filesystem backend
// ─────────────────────────────────────────────────────────────────────────────

/// [`Backend`] implementation over `std::fs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsBackend;

impl Backend for FsBackend {
    type File = File;

    fn open(&self, path: &Path, mode: FileMode) -> io::Result<File> {
        let mut opts = OpenOptions::new();
        match mode {
            FileMode::ReadOnly => opts.read(true),
            FileMode::ReadWrite => opts.read(true).write(true),
            FileMode::CreateNew => opts.read(true).write(true).create_new(true),
        };
        opts.open(path)
    }

    fn create_lock(&self, path: &Path) -> io::Result<()> {
        let mut opts = OpenOptions::new();
        opts.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o000);
        }
        opts.open(path).map(drop)
    }

    fn unlink(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

impl BackendFile for File {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Seek::seek(self, pos)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(self, buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        Write::write_all(self, buf)
    }

    fn truncate(&mut self, size: u64) -> io::Result<()> {
        self.set_len(size)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory backend
// ─────────────────────────────────────────────────────────────────────────────

/// [`Backend`] implementation over shared in-memory buffers.
///
/// Clones share the same file namespace, so a test can hold the backend and
/// inspect files while a dataset owns another handle to the same store. The
/// engine is single-threaded by contract, so `Rc<RefCell<..>>` suffices.
#[derive(Clone, Default, Debug)]
pub struct MemBackend {
    files: Rc<RefCell<HashMap<PathBuf, Rc<RefCell<Vec<u8>>>>>>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a file exists in the store.
    pub fn exists(&self, path: &Path) -> bool {
        self.files.borrow().contains_key(path)
    }

    /// Snapshot of a file's contents, for assertions.
    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.borrow().get(path).map(|data| data.borrow().clone())
    }

    /// Overwrites (or creates) a file, for fixtures.
    pub fn put(&self, path: &Path, bytes: &[u8]) {
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), Rc::new(RefCell::new(bytes.to_vec())));
    }
}

impl Backend for MemBackend {
    type File = MemFile;

    fn open(&self, path: &Path, mode: FileMode) -> io::Result<MemFile> {
        let mut files = self.files.borrow_mut();
        let data = match mode {
            FileMode::CreateNew => {
                if files.contains_key(path) {
                    return Err(io::Error::new(io::ErrorKind::AlreadyExists, "file exists"));
                }
                let data = Rc::new(RefCell::new(Vec::new()));
                files.insert(path.to_path_buf(), Rc::clone(&data));
                data
            }
            FileMode::ReadOnly | FileMode::ReadWrite => Rc::clone(
                files
                    .get(path)
                    .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))?,
            ),
        };
        Ok(MemFile { data, pos: 0 })
    }

    fn create_lock(&self, path: &Path) -> io::Result<()> {
        let mut files = self.files.borrow_mut();
        if files.contains_key(path) {
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, "file exists"));
        }
        files.insert(path.to_path_buf(), Rc::new(RefCell::new(Vec::new())));
        Ok(())
    }

    fn unlink(&self, path: &Path) -> io::Result<()> {
        self.files
            .borrow_mut()
            .remove(path)
            .map(drop)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }
}

/// A cursor over one in-memory file.
#[derive(Debug)]
pub struct MemFile {
    data: Rc<RefCell<Vec<u8>>>,
    pos: u64,
}

impl BackendFile for MemFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = self.data.borrow().len() as u64;
        let new_pos = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::End(n) => len.checked_add_signed(n),
            SeekFrom::Current(n) => self.pos.checked_add_signed(n),
        };
        match new_pos {
            Some(n) => {
                self.pos = n;
                Ok(n)
            }
            None => Err(io::Error::new(io::ErrorKind::InvalidInput, "seek out of range")),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.data.borrow();
        if self.pos >= data.len() as u64 {
            return Ok(0);
        }
        let start = self.pos as usize;
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let mut data = self.data.borrow_mut();
        let start = self.pos as usize;
        // Writing past the end leaves a zero-filled hole, like a sparse file.
        if start > data.len() {
            data.resize(start, 0);
        }
        let overlap = buf.len().min(data.len().saturating_sub(start));
        data[start..start + overlap].copy_from_slice(&buf[..overlap]);
        data.extend_from_slice(&buf[overlap..]);
        self.pos += buf.len() as u64;
        Ok(())
    }

    fn truncate(&mut self, size: u64) -> io::Result<()> {
        self.data.borrow_mut().resize(size as usize, 0);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
