//! Scanner — walks a source tree and yields the files to mirror.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::error::{Result, SyncError};

/// Walks a directory tree and filters by extension.
#[derive(Debug, Clone)]
pub struct Scanner {
    ext: String,
}

impl Scanner {
    /// Scanner for files with extension `ext` (no dot).
    pub fn new(ext: impl Into<String>) -> Self {
        Self { ext: ext.into() }
    }

    /// Returns `true` when `ext` matches the scanned extension.
    ///
    /// The comparison is **case-insensitive**: `FLAC`, `Flac` and `flac`
    /// are all picked up.
    #[must_use]
    pub fn is_supported_extension(&self, ext: &str) -> bool {
        ext.eq_ignore_ascii_case(&self.ext)
    }

    /// Collect every matching file under `root`, sorted by path.
    ///
    /// A single file is returned as-is if it matches.
    ///
    /// # Errors
    ///
    /// The first walk error (unreadable directory, vanished root).
    pub fn scan(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(SyncError::from)?;
            if is_file_or_file_link(&entry) && self.matches(entry.path()) {
                files.push(entry.into_path());
            }
        }
        tracing::debug!(root = %root.display(), count = files.len(), "scan complete");
        Ok(files)
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.is_supported_extension(e))
    }
}

/// Regular files, plus symlinks whose target is a regular file. Links to
/// directories are not followed.
fn is_file_or_file_link(entry: &DirEntry) -> bool {
    let kind = entry.file_type();
    kind.is_file() || (kind.is_symlink() && entry.path().is_file())
}
