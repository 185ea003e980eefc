//! Command-line interface for the `sparsefile` binary.
//!
//! Seven subcommands expose the engine: `create`, `add`, `set-size`,
//! `read`, `find-offset`, `list-ranges`, `get-index`. Every subcommand
//! takes the shared dataset path flags (`--dataset`, `--index-path`,
//! `--lockfile-path`).
//!
//! Exit codes are shared across all subcommands:
//!
//! | code | meaning |
//! |------|---------|
//! | 0    | success |
//! | 1    | success, but no result (`find-offset` found nothing) |
//! | 2    | usage error (reported by clap) |
//! | 3    | application error |

pub mod commands;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::data::ConflictMode;
use crate::dataset::{Dataset, OpenMode};
use crate::index::FindMode;

// ── Exit codes ────────────────────────────────────────────────────────────────

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_NO_RESULT: i32 = 1;
pub const EXIT_USAGE_ERROR: i32 = 2;
pub const EXIT_APP_ERROR: i32 = 3;

// ── Command tree ──────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "sparsefile",
    version,
    about = "Manage sparsely populated byte files",
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new, empty dataset
    Create(CreateArgs),
    /// Write bytes from a source (or stdin) into the dataset
    Add(AddArgs),
    /// Grow or shrink the data file
    SetSize(SetSizeArgs),
    /// Write present bytes to stdout
    Read(ReadArgs),
    /// Find the first present or absent offset
    FindOffset(FindOffsetArgs),
    /// List present (or missing) ranges
    ListRanges(ListRangesArgs),
    /// Write the raw index encoding to stdout
    GetIndex(GetIndexArgs),
}

/// Dataset path flags shared by every subcommand.
#[derive(Args)]
pub struct DatasetArgs {
    /// Path of the data file
    #[arg(long, value_name = "PATH")]
    pub dataset: PathBuf,

    /// Path of the index file [default: <DATASET>.idx]
    #[arg(long, value_name = "PATH")]
    pub index_path: Option<PathBuf>,

    /// Path of the lock file [default: <DATASET>.lck]
    #[arg(long, value_name = "PATH")]
    pub lockfile_path: Option<PathBuf>,
}

impl DatasetArgs {
    /// Opens the dataset in the given mode, attaching the dataset path to
    /// any failure.
    pub fn open(&self, mode: OpenMode) -> anyhow::Result<Dataset> {
        Dataset::open(
            &self.dataset,
            self.index_path.as_deref(),
            self.lockfile_path.as_deref(),
            mode,
        )
        .with_context(|| format!("cannot open dataset {}", self.dataset.display()))
    }
}

#[derive(Args)]
pub struct CreateArgs {
    #[command(flatten)]
    pub paths: DatasetArgs,

    /// Initial size of the data file in bytes
    #[arg(long, value_name = "N")]
    pub size: Option<u64>,
}

#[derive(Args)]
pub struct AddArgs {
    #[command(flatten)]
    pub paths: DatasetArgs,

    /// Logical offset at which the source bytes start
    #[arg(long, value_name = "N")]
    pub offset: u64,

    /// File to read from; "-" or absent means stdin
    #[arg(long, value_name = "PATH")]
    pub source: Option<String>,

    /// What to do when bytes are already present
    #[arg(long, value_enum, default_value_t = OnConflict::Error)]
    pub on_conflict: OnConflict,

    /// Fail unless the source is exactly this many bytes long
    #[arg(long, value_name = "N")]
    pub enforce_length: Option<u64>,
}

#[derive(Args)]
pub struct SetSizeArgs {
    #[command(flatten)]
    pub paths: DatasetArgs,

    /// New size of the data file in bytes
    #[arg(long, value_name = "N")]
    pub size: u64,

    /// Allow dropping present bytes past the new size
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ReadArgs {
    #[command(flatten)]
    pub paths: DatasetArgs,

    /// Offset to start reading at
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub offset: u64,

    /// Number of bytes to read; absent means read to the next gap
    #[arg(long, value_name = "N")]
    pub length: Option<u64>,

    /// Upper bound on the number of bytes written to stdout
    #[arg(long, value_name = "N")]
    pub limit: Option<u64>,
}

#[derive(Args)]
pub struct FindOffsetArgs {
    #[command(flatten)]
    pub paths: DatasetArgs,

    /// Offset to start searching at
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub start_at: u64,

    /// What to search for
    #[arg(long, value_enum)]
    pub stop_at: StopAt,
}

#[derive(Args)]
pub struct ListRangesArgs {
    #[command(flatten)]
    pub paths: DatasetArgs,

    /// How range bounds are printed
    #[arg(long, value_enum, default_value_t = RangeFormat::Inclusive)]
    pub range_format: RangeFormat,

    /// List the gaps between present ranges instead
    #[arg(long)]
    pub missing: bool,
}

#[derive(Args)]
pub struct GetIndexArgs {
    #[command(flatten)]
    pub paths: DatasetArgs,

    /// Omit ranges shorter than this many bytes
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub min_range_length: u64,
}

// ── Flag value enums ──────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OnConflict {
    /// Fail when existing bytes differ
    Error,
    /// Keep the existing bytes
    Keep,
    /// Replace the existing bytes
    Overwrite,
}

impl From<OnConflict> for ConflictMode {
    fn from(value: OnConflict) -> Self {
        match value {
            OnConflict::Error => ConflictMode::Error,
            OnConflict::Keep => ConflictMode::KeepOld,
            OnConflict::Overwrite => ConflictMode::Overwrite,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StopAt {
    /// Stop at the first present byte
    Data,
    /// Stop at the first absent byte
    NoData,
}

impl From<StopAt> for FindMode {
    fn from(value: StopAt) -> Self {
        match value {
            StopAt::Data => FindMode::Data,
            StopAt::NoData => FindMode::NoData,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RangeFormat {
    /// Print `first..last` with both bounds included
    Inclusive,
    /// Print `first...end` where `end` is one past the last byte
    Exclusive,
}

/// Dispatches a parsed command line and returns the process exit code.
pub fn run(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Command::Create(args) => commands::create(&args),
        Command::Add(args) => commands::add(&args),
        Command::SetSize(args) => commands::set_size(&args),
        Command::Read(args) => commands::read(&args),
        Command::FindOffset(args) => commands::find_offset(&args),
        Command::ListRanges(args) => commands::list_ranges(&args),
        Command::GetIndex(args) => commands::get_index(&args),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
