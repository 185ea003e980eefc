//! Dataset lifecycle: path derivation, locking, the open-mode matrix, and
//! close.
//!
//! A dataset is the unit formed by a data file, an index file, and a lock
//! file. The lock is acquired before either file is opened and released
//! after both are closed; it is a best-effort advisory mutex between
//! processes. A lock left behind by a crashed process is not recovered
//! automatically and must be removed by the operator.

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use crate::backend::{Backend, BackendFile, FileMode, FsBackend};
use crate::cache::IndexCache;
use crate::error::{Error, ErrorKind, Result};

/// Default extension appended to the data path for the index file.
pub const INDEX_EXTENSION: &str = ".idx";

/// Default extension appended to the data path for the lock file.
pub const LOCK_EXTENSION: &str = ".lck";

/// Platform bound on derived path lengths, in bytes.
#[cfg(unix)]
pub const MAX_PATH_LEN: usize = libc::PATH_MAX as usize;
#[cfg(windows)]
pub const MAX_PATH_LEN: usize = 260;

// ─────────────────────────────────────────────────────────────────────────────
// Open modes
// ─────────────────────────────────────────────────────────────────────────────

/// How to open (or create) the data and index files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    /// Open an existing dataset; reject writes.
    ExistingReadOnly,
    /// Open an existing dataset for reading and writing.
    ExistingReadWrite,
    /// Create a new dataset; fail if either file already exists.
    CreateNew,
    /// Open an existing dataset, or create one if the data file is absent.
    /// The index file mirrors the decision taken for the data file.
    OpenOrCreate,
}

impl OpenMode {
    fn file_mode(self) -> FileMode {
        match self {
            OpenMode::ExistingReadOnly => FileMode::ReadOnly,
            OpenMode::ExistingReadWrite | OpenMode::OpenOrCreate => FileMode::ReadWrite,
            OpenMode::CreateNew => FileMode::CreateNew,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dataset
// ─────────────────────────────────────────────────────────────────────────────

/// An open dataset. Owns the data and index file handles and the lock file;
/// dropped handles are closed by the OS, but [`Dataset::close`] should be
/// preferred so that the index cache is flushed and the lock removed.
#[derive(Debug)]
pub struct Dataset<B: Backend = FsBackend> {
    pub(crate) backend: B,
    data_path: PathBuf,
    index_path: PathBuf,
    lock_path: PathBuf,
    pub(crate) data_file: B::File,
    pub(crate) index_file: B::File,
    pub(crate) read_only: bool,
    /// Authoritative byte length of the index, including unflushed edits.
    pub(crate) total_index_size: u64,
    /// Byte length the index file currently has on disk.
    pub(crate) index_size_on_disk: u64,
    /// Current OS-level cursor of the index file handle.
    pub(crate) index_pos: u64,
    pub(crate) cache: IndexCache,
    /// Bumped on every committed index edit; iterators capture it.
    pub(crate) revision: u64,
}

impl Dataset<FsBackend> {
    /// Opens a dataset on the real filesystem. `index_path` and `lock_path`
    /// default to the data path with [`INDEX_EXTENSION`] / [`LOCK_EXTENSION`]
    /// appended.
    pub fn open(
        data_path: &Path,
        index_path: Option<&Path>,
        lock_path: Option<&Path>,
        mode: OpenMode,
    ) -> Result<Self> {
        Self::open_with(FsBackend, data_path, index_path, lock_path, mode)
    }
}

impl<B: Backend> Dataset<B> {
    /// Opens a dataset against an arbitrary backend. See [`Dataset::open`].
    pub fn open_with(
        backend: B,
        data_path: &Path,
        index_path: Option<&Path>,
        lock_path: Option<&Path>,
        mode: OpenMode,
    ) -> Result<Self> {
        let data_path = data_path.to_path_buf();
        let index_path = derive_path(&data_path, index_path, INDEX_EXTENSION)?;
        let lock_path = derive_path(&data_path, lock_path, LOCK_EXTENSION)?;

        match backend.create_lock(&lock_path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::new(ErrorKind::DatasetLocked));
            }
            Err(err) => return Err(Error::io("create-lock", err)),
        }

        match Self::open_locked(backend, data_path, index_path, lock_path, mode) {
            Ok(dataset) => Ok(dataset),
            Err((backend, lock_path, err)) => {
                let _ = backend.unlink(&lock_path);
                Err(err)
            }
        }
    }

    /// Continues an open after the lock has been taken. On failure the
    /// caller removes the lock; the error is returned alongside the pieces
    /// it needs to do so.
    fn open_locked(
        backend: B,
        data_path: PathBuf,
        index_path: PathBuf,
        lock_path: PathBuf,
        mode: OpenMode,
    ) -> std::result::Result<Self, (B, PathBuf, Error)> {
        let (data_file, index_file) = match open_files(&backend, &data_path, &index_path, mode) {
            Ok(files) => files,
            Err(err) => return Err((backend, lock_path, err)),
        };

        let mut dataset = Dataset {
            backend,
            data_path,
            index_path,
            lock_path,
            data_file,
            index_file,
            read_only: mode == OpenMode::ExistingReadOnly,
            total_index_size: 0,
            index_size_on_disk: 0,
            index_pos: 0,
            cache: IndexCache::new(),
            revision: initial_revision(),
        };

        // The file length is the authoritative index size.
        let size = match dataset.index_file.seek(SeekFrom::End(0)) {
            Ok(size) => dataset.index_file.seek(SeekFrom::Start(0)).map(|_| size),
            Err(err) => Err(err),
        };
        match size {
            Ok(size) => {
                dataset.total_index_size = size;
                dataset.index_size_on_disk = size;
                log::debug!(
                    "opened dataset {:?} ({} index bytes, read_only={})",
                    dataset.data_path,
                    size,
                    dataset.read_only
                );
                Ok(dataset)
            }
            Err(err) => {
                let Dataset { backend, lock_path, .. } = dataset;
                Err((backend, lock_path, Error::io("seek", err)))
            }
        }
    }

    /// Flushes the index cache, closes both file handles, and removes the
    /// lock file. All steps are attempted even when an earlier one fails;
    /// the first error is returned.
    pub fn close(mut self) -> Result<()> {
        let flushed = self.index_flush();
        let Dataset { backend, data_file, index_file, lock_path, data_path, .. } = self;
        // Handle close errors are not observable through std; dropping the
        // handles releases them in every case.
        drop(data_file);
        drop(index_file);
        let unlocked = backend.unlink(&lock_path).map_err(|err| Error::io("unlink", err));
        log::debug!("closed dataset {:?}", data_path);
        flushed.and(unlocked)
    }

    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    #[inline]
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    #[inline]
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    #[inline]
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    pub(crate) fn ensure_writable(&self) -> Result<()> {
        if self.read_only {
            Err(Error::new(ErrorKind::DatasetReadOnly))
        } else {
            Ok(())
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Open helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Opens the data and index files per the open-mode matrix. On failure no
/// handle is leaked, and a data file that was created by this call is
/// removed again.
fn open_files<B: Backend>(
    backend: &B,
    data_path: &Path,
    index_path: &Path,
    mode: OpenMode,
) -> Result<(B::File, B::File)> {
    let (data_file, data_created) = match mode {
        OpenMode::OpenOrCreate => match backend.open(data_path, FileMode::CreateNew) {
            Ok(file) => (file, true),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                // Known race: if the file is deleted between the exclusive
                // create and this open, the open fails and the race is
                // reported as an ordinary I/O error.
                let file =
                    backend.open(data_path, FileMode::ReadWrite).map_err(|e| Error::io("open", e))?;
                (file, false)
            }
            Err(err) => return Err(Error::io("open", err)),
        },
        _ => {
            let file =
                backend.open(data_path, mode.file_mode()).map_err(|e| Error::io("open", e))?;
            (file, mode == OpenMode::CreateNew)
        }
    };

    let index_mode = if data_created { FileMode::CreateNew } else { mode.file_mode() };
    match backend.open(index_path, index_mode) {
        Ok(index_file) => Ok((data_file, index_file)),
        Err(err) => {
            drop(data_file);
            if data_created {
                let _ = backend.unlink(data_path);
            }
            Err(Error::io("open", err))
        }
    }
}

/// Resolves a companion path: the user-supplied one, or the data path with
/// `extension` appended. Fails with `InvalidArgument` when the result
/// exceeds the platform path bound.
fn derive_path(data_path: &Path, user: Option<&Path>, extension: &str) -> Result<PathBuf> {
    let path = match user {
        Some(path) => path.to_path_buf(),
        None => {
            let mut os = data_path.as_os_str().to_os_string();
            os.push(extension);
            PathBuf::from(os)
        }
    };
    if path.as_os_str().len() >= MAX_PATH_LEN {
        return Err(Error::new(ErrorKind::InvalidArgument));
    }
    Ok(path)
}

/// Initial revision counter. The low half is left zero for increments; the
/// random high half makes iterators from different datasets observably
/// incompatible.
fn initial_revision() -> u64 {
    u64::from(rand::random::<u32>()) << 32
}

// ── Tests ─────────────────────────────────────────────────────────────────────
