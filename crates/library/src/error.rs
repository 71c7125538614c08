//! Error types for the sync engine.

use std::path::PathBuf;
use std::process::ExitStatus;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Result alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Filesystem operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsOp {
    /// Creating an output directory.
    CreateDir,
    /// Reading file metadata (mtime, existence).
    Stat,
    /// Renaming the temp file onto the final output.
    Rename,
    /// Walking a directory tree.
    Walk,
    /// Deleting a file.
    Remove,
}

impl std::fmt::Display for FsOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::CreateDir => "create directory",
            Self::Stat => "stat",
            Self::Rename => "rename",
            Self::Walk => "walk",
            Self::Remove => "remove",
        })
    }
}

/// Failure of the external encoder.
#[derive(Error, Debug)]
pub enum EncodeError {
    /// The encoder process could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// Program name.
        program: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The encoder exited unsuccessfully.
    #[error("{program} failed ({status}){}", stderr_suffix(.stderr))]
    Failed {
        /// Program name.
        program: String,
        /// Exit status.
        status: ExitStatus,
        /// Captured standard error, verbatim. Empty unless captured.
        stderr: String,
    },

    /// The encoder is not on `PATH`.
    #[error("{program} not found in PATH")]
    NotFound {
        /// Program name.
        program: String,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(", stderr: {stderr}")
    }
}

/// Per-file or per-tree sync failure.
///
/// None of these abort a tree run; they are collected per file.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Encoder failure. The temp file has been removed and the final output
    /// is untouched.
    #[error("converting {source_path}: {error}")]
    Encoder {
        /// Source file being converted.
        source_path: PathBuf,
        /// What the encoder reported.
        #[source]
        error: EncodeError,
    },

    /// Filesystem failure. After a failed rename the temp file is kept for
    /// manual inspection.
    #[error("{op} {path}: {source}")]
    Filesystem {
        /// Operation attempted.
        op: FsOp,
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A source file is not under the configured source root.
    #[error("{path} is not under {root}")]
    OutsideRoot {
        /// Offending path.
        path: PathBuf,
        /// Configured root.
        root: PathBuf,
    },
}

impl SyncError {
    pub(crate) fn fs(op: FsOp, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            op,
            path: path.into(),
            source,
        }
    }
}

impl From<walkdir::Error> for SyncError {
    fn from(e: walkdir::Error) -> Self {
        let path = e.path().map(PathBuf::from).unwrap_or_default();
        let source = e
            .into_io_error()
            .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
        Self::fs(FsOp::Walk, path, source)
    }
}

/// Serialise `(path, error)` pairs as `{ "path": .., "error": "<message>" }`.
pub(crate) fn serialize_failures<S: Serializer>(
    failed: &[(PathBuf, SyncError)],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    struct Failure<'a> {
        path: &'a PathBuf,
        error: String,
    }

    serializer.collect_seq(failed.iter().map(|(path, e)| Failure {
        path,
        error: e.to_string(),
    }))
}
