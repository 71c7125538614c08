//! Progress events of a sync run, delivered to an explicit [`SyncObserver`].

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// One step of a sync or prune pass. Paths are relative to their root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    /// Output is at least as new as the source.
    Skipped {
        /// Source path relative to the source root.
        path: PathBuf,
    },
    /// Encoder started for this file.
    Converting {
        /// Source path relative to the source root.
        path: PathBuf,
    },
    /// Output committed.
    Converted {
        /// Source path relative to the source root.
        path: PathBuf,
    },
    /// Output without a source was deleted.
    RemovedOrphan {
        /// Output path relative to the output root.
        path: PathBuf,
    },
    /// Leftover temp file was deleted.
    RemovedTemp {
        /// Output path relative to the output root.
        path: PathBuf,
    },
    /// Empty output directory was deleted.
    RemovedDir {
        /// Directory relative to the output root.
        path: PathBuf,
    },
}

impl SyncEvent {
    /// True for the per-file detail events (skips and removals).
    #[must_use]
    pub fn is_verbose(&self) -> bool {
        !matches!(self, Self::Converting { .. } | Self::Converted { .. })
    }
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped { path } => write!(f, "Skipping (up to date): {}", path.display()),
            Self::Converting { path } => write!(f, "Converting: {}", path.display()),
            Self::Converted { path } => write!(f, "Converted: {}", path.display()),
            Self::RemovedOrphan { path } => write!(f, "Removed orphan: {}", path.display()),
            Self::RemovedTemp { path } => write!(f, "Removed stale temp file: {}", path.display()),
            Self::RemovedDir { path } => write!(f, "Removed empty directory: {}", path.display()),
        }
    }
}

/// Receiver of [`SyncEvent`]s.
pub trait SyncObserver {
    /// Handle one event.
    fn on_event(&mut self, event: SyncEvent);
}

impl SyncObserver for Vec<SyncEvent> {
    fn on_event(&mut self, event: SyncEvent) {
        self.push(event);
    }
}

/// Discards every event.
impl SyncObserver for () {
    fn on_event(&mut self, _event: SyncEvent) {}
}

/// Adapter turning a closure into a [`SyncObserver`].
pub struct FnObserver<F>(pub F);

impl<F: FnMut(SyncEvent)> SyncObserver for FnObserver<F> {
    fn on_event(&mut self, event: SyncEvent) {
        (self.0)(event);
    }
}
