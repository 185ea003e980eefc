//! Error taxonomy for the dataset engine.
//!
//! Every fallible engine operation returns [`Result`]. An [`Error`] carries
//! an abstract [`ErrorKind`], and, for I/O failures, the platform error code
//! together with a short label naming the failing primitive (`"seek"`,
//! `"read"`, `"write"`, ...). The dataset itself does not store a last-error
//! record; the error value is the carrier.

use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// ErrorKind
// ─────────────────────────────────────────────────────────────────────────────

/// Abstract error codes of the engine. The discriminants of the first eight
/// variants are stable and part of the public contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorKind {
    /// A platform I/O primitive failed. Carries the OS error code and the
    /// primitive label on the [`Error`] value.
    Io = 1,
    /// The lock file already exists; another process owns the dataset.
    DatasetLocked = 2,
    /// A non-destructive shrink would drop bytes covered by the index.
    SizeTooSmall = 3,
    /// The index file contains a malformed or truncated varint.
    InvalidIndexFormat = 4,
    /// Incoming bytes differ from existing bytes under `ConflictMode::Error`.
    DataConflict = 5,
    /// A read was requested outside the present data.
    ReadOutOfBounds = 6,
    /// A caller-supplied argument is unusable (e.g. an over-long path).
    InvalidArgument = 7,
    /// The iterator was created before the most recent index mutation.
    DeadIndexIterator = 8,
    /// A mutating operation was attempted on a read-only dataset.
    DatasetReadOnly = 9,
    /// An index edit spans more bytes than the single cache window can hold.
    IndexTooLarge = 10,
}

impl ErrorKind {
    /// Stable numeric code.
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Stable upper-case name.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Io => "IO",
            ErrorKind::DatasetLocked => "DATASET_LOCKED",
            ErrorKind::SizeTooSmall => "SIZE_TOO_SMALL",
            ErrorKind::InvalidIndexFormat => "INVALID_INDEX_FORMAT",
            ErrorKind::DataConflict => "DATA_CONFLICT",
            ErrorKind::ReadOutOfBounds => "READ_OUT_OF_BOUNDS",
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::DeadIndexIterator => "DEAD_INDEX_ITERATOR",
            ErrorKind::DatasetReadOnly => "DATASET_READ_ONLY",
            ErrorKind::IndexTooLarge => "INDEX_TOO_LARGE",
        }
    }

    /// Human-readable message.
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::Io => "System input/output error",
            ErrorKind::DatasetLocked => "Dataset locked by another process",
            ErrorKind::SizeTooSmall => "Size too small to contain data",
            ErrorKind::InvalidIndexFormat => "Invalid index format",
            ErrorKind::DataConflict => "Data conflicts with existing data",
            ErrorKind::ReadOutOfBounds => "Read out of bounds",
            ErrorKind::InvalidArgument => "Invalid argument",
            ErrorKind::DeadIndexIterator => "Index iterator is too old",
            ErrorKind::DatasetReadOnly => "Dataset is read-only",
            ErrorKind::IndexTooLarge => "Index too large to edit in place",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error
// ─────────────────────────────────────────────────────────────────────────────

/// An engine error: the abstract kind plus, for I/O failures, the failing
/// primitive and the platform error code.
#[derive(Clone, Debug)]
pub struct Error {
    kind: ErrorKind,
    primitive: Option<&'static str>,
    os_code: Option<i32>,
}

impl Error {
    /// A purely logical error with no platform attachment.
    #[inline]
    pub fn new(kind: ErrorKind) -> Self {
        Error { kind, primitive: None, os_code: None }
    }

    /// Wraps a failed platform primitive. `primitive` names the operation
    /// that failed ("open", "seek", "read", "write", "truncate", "unlink",
    /// "create-lock").
    pub fn io(primitive: &'static str, err: std::io::Error) -> Self {
        Error { kind: ErrorKind::Io, primitive: Some(primitive), os_code: err.raw_os_error() }
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Label of the platform primitive that failed, for I/O errors.
    #[inline]
    pub fn primitive(&self) -> Option<&'static str> {
        self.primitive
    }

    /// Platform error code collected at the point of failure, for I/O errors.
    #[inline]
    pub fn os_code(&self) -> Option<i32> {
        self.os_code
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.message())?;
        match (self.primitive, self.os_code) {
            (Some(prim), Some(code)) => write!(f, " ({}: os error {})", prim, code),
            (Some(prim), None) => write!(f, " ({})", prim),
            _ => Ok(()),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

// ── Tests ─────────────────────────────────────────────────────────────────────
