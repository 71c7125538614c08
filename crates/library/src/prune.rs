//! Orphan pruning of the output tree.
//!
//! Two passes: [`plan_prune`] walks both trees and decides what to delete
//! without touching anything; [`apply_prune`] deletes files, then tries
//! every candidate directory deepest-first. `remove_dir` refuses non-empty
//! directories, which is exactly the "only if empty" rule.
//!
//! Directories whose name starts with `.` below the output root (sync-tool
//! bookkeeping such as `.stfolder`) are never entered or deleted.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use crate::error::{serialize_failures, FsOp, Result, SyncError};
use crate::events::{SyncEvent, SyncObserver};
use crate::layout::{source_key, MirrorLayout};
use crate::scanner::Scanner;

/// Deletion set computed by [`plan_prune`]. All paths are absolute (or as
/// rooted as the layout's output root).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrunePlan {
    /// Output root; used to report relative paths and never deleted.
    pub output_root: PathBuf,
    /// Output files with no matching source.
    pub orphans: Vec<PathBuf>,
    /// Leftover `*.<target>.tmp` files.
    pub temps: Vec<PathBuf>,
    /// Every visible directory below the output root, deepest first.
    pub dirs: Vec<PathBuf>,
}

impl PrunePlan {
    /// True if there are no files to delete. Directories may still be
    /// removed if empty.
    #[must_use]
    pub fn has_no_files(&self) -> bool {
        self.orphans.is_empty() && self.temps.is_empty()
    }
}

/// What [`apply_prune`] actually removed. Paths are relative to the output
/// root.
#[derive(Debug, Default, Serialize)]
pub struct PruneReport {
    /// Deleted orphan outputs.
    pub removed_orphans: Vec<PathBuf>,
    /// Deleted temp files.
    pub removed_temps: Vec<PathBuf>,
    /// Deleted (empty) directories.
    pub removed_dirs: Vec<PathBuf>,
    /// Files that could not be deleted.
    #[serde(serialize_with = "serialize_failures")]
    pub failed: Vec<(PathBuf, SyncError)>,
}

/// Compute the deletion set for `layout.output_root`.
///
/// A missing output root yields an empty plan.
///
/// # Errors
///
/// Walk failures in either tree. A failed source scan aborts the plan, since
/// an incomplete source key set would mark live outputs as orphans.
pub fn plan_prune(layout: &MirrorLayout) -> Result<PrunePlan> {
    let mut plan = PrunePlan {
        output_root: layout.output_root.clone(),
        ..PrunePlan::default()
    };
    if !layout.output_root.is_dir() {
        return Ok(plan);
    }

    let keys: HashSet<PathBuf> = Scanner::new(&layout.source_ext)
        .scan(&layout.source_root)?
        .iter()
        .filter_map(|p| layout.relative(p).ok().map(source_key))
        .collect();

    let walker = WalkDir::new(&layout.output_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden_dir(e));

    for entry in walker {
        let entry = entry?;
        if entry.depth() == 0 {
            continue;
        }
        let path = entry.path();
        if entry.file_type().is_dir() {
            plan.dirs.push(path.to_path_buf());
        } else if entry.file_type().is_file() {
            if layout.is_temp(path) {
                plan.temps.push(path.to_path_buf());
            } else if layout.is_output(path) {
                let rel = path.strip_prefix(&layout.output_root).unwrap_or(path);
                if !keys.contains(&source_key(rel)) {
                    plan.orphans.push(path.to_path_buf());
                }
            }
        }
    }

    plan.dirs.sort_by(|a, b| {
        b.components()
            .count()
            .cmp(&a.components().count())
            .then_with(|| a.cmp(b))
    });

    tracing::debug!(
        root = %layout.output_root.display(),
        orphans = plan.orphans.len(),
        temps = plan.temps.len(),
        dirs = plan.dirs.len(),
        "prune planned"
    );
    Ok(plan)
}

/// Carry out `plan`.
///
/// File deletion failures are collected in the report; a file that is
/// already gone counts as removed. Directory deletion failures are ignored.
pub fn apply_prune(plan: &PrunePlan, observer: &mut impl SyncObserver) -> PruneReport {
    let mut report = PruneReport::default();
    let rel = |p: &Path| p.strip_prefix(&plan.output_root).unwrap_or(p).to_path_buf();

    for path in &plan.temps {
        match remove_file(path) {
            Ok(()) => {
                observer.on_event(SyncEvent::RemovedTemp { path: rel(path) });
                report.removed_temps.push(rel(path));
            }
            Err(e) => report.failed.push((rel(path), e)),
        }
    }

    for path in &plan.orphans {
        match remove_file(path) {
            Ok(()) => {
                observer.on_event(SyncEvent::RemovedOrphan { path: rel(path) });
                report.removed_orphans.push(rel(path));
            }
            Err(e) => report.failed.push((rel(path), e)),
        }
    }

    for dir in &plan.dirs {
        if dir == &plan.output_root {
            continue;
        }
        match fs::remove_dir(dir) {
            Ok(()) => {
                observer.on_event(SyncEvent::RemovedDir { path: rel(dir) });
                report.removed_dirs.push(rel(dir));
            }
            Err(e) => tracing::trace!(dir = %dir.display(), error = %e, "directory kept"),
        }
    }

    report
}

fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SyncError::fs(FsOp::Remove, path, e)),
    }
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name().to_string_lossy().starts_with('.')
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn setup() -> (TempDir, MirrorLayout) {
        let tmp = TempDir::new().unwrap();
        let layout = MirrorLayout::flac_to_opus(tmp.path().join("src"), tmp.path().join("out"));
        fs::create_dir_all(&layout.source_root).unwrap();
        fs::create_dir_all(&layout.output_root).unwrap();
        (tmp, layout)
    }

    #[test]
    fn plan_classifies_without_deleting() {
        let (_tmp, l) = setup();
        touch(&l.source_root.join("A/keep.flac"));
        touch(&l.output_root.join("A/keep.opus"));
        touch(&l.output_root.join("A/gone.opus"));
        touch(&l.output_root.join("A/keep.opus.tmp"));
        touch(&l.output_root.join("A/cover.jpg"));

        let plan = plan_prune(&l).unwrap();
        assert_eq!(plan.orphans, vec![l.output_root.join("A/gone.opus")]);
        assert_eq!(plan.temps, vec![l.output_root.join("A/keep.opus.tmp")]);
        assert_eq!(plan.dirs, vec![l.output_root.join("A")]);
        assert!(l.output_root.join("A/gone.opus").exists());
    }

    #[test]
    fn uppercase_source_extension_still_pairs() {
        let (_tmp, l) = setup();
        touch(&l.source_root.join("Song.FLAC"));
        touch(&l.output_root.join("Song.opus"));
        assert!(plan_prune(&l).unwrap().orphans.is_empty());
    }

    #[test]
    fn stem_comparison_is_exact() {
        let (_tmp, l) = setup();
        touch(&l.source_root.join("song.flac"));
        touch(&l.output_root.join("Song.opus"));
        assert_eq!(
            plan_prune(&l).unwrap().orphans,
            vec![l.output_root.join("Song.opus")]
        );
    }

    #[test]
    fn hidden_directories_are_not_entered() {
        let (_tmp, l) = setup();
        touch(&l.output_root.join(".stfolder/x.opus"));
        touch(&l.output_root.join(".stfolder/y.opus.tmp"));
        let plan = plan_prune(&l).unwrap();
        assert!(plan.has_no_files());
        assert!(plan.dirs.is_empty());
    }

    #[test]
    fn dirs_are_ordered_deepest_first() {
        let (_tmp, l) = setup();
        fs::create_dir_all(l.output_root.join("a/b/c")).unwrap();
        fs::create_dir_all(l.output_root.join("z")).unwrap();
        let plan = plan_prune(&l).unwrap();
        assert_eq!(
            plan.dirs,
            vec![
                l.output_root.join("a/b/c"),
                l.output_root.join("a/b"),
                l.output_root.join("a"),
                l.output_root.join("z"),
            ]
        );
    }

    #[test]
    fn apply_removes_files_then_empty_dirs_only() {
        let (_tmp, l) = setup();
        touch(&l.source_root.join("Keep/a.flac"));
        touch(&l.output_root.join("Keep/a.opus"));
        touch(&l.output_root.join("Gone/Deep/b.opus"));
        touch(&l.output_root.join("Gone/Deep/b.opus.tmp"));

        let plan = plan_prune(&l).unwrap();
        let mut events: Vec<SyncEvent> = Vec::new();
        let report = apply_prune(&plan, &mut events);

        assert!(report.failed.is_empty());
        assert_eq!(report.removed_orphans, vec![PathBuf::from("Gone/Deep/b.opus")]);
        assert_eq!(report.removed_temps, vec![PathBuf::from("Gone/Deep/b.opus.tmp")]);
        assert_eq!(
            report.removed_dirs,
            vec![PathBuf::from("Gone/Deep"), PathBuf::from("Gone")]
        );
        assert!(l.output_root.join("Keep/a.opus").exists());
        assert!(!l.output_root.join("Gone").exists());
        assert!(l.output_root.exists());
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn missing_output_root_is_empty_plan() {
        let (tmp, mut l) = setup();
        l.output_root = tmp.path().join("nowhere");
        let plan = plan_prune(&l).unwrap();
        assert!(plan.has_no_files() && plan.dirs.is_empty());
    }

    #[test]
    fn missing_source_root_aborts_plan() {
        let (tmp, mut l) = setup();
        touch(&l.output_root.join("a.opus"));
        l.source_root = tmp.path().join("unmounted");
        assert!(plan_prune(&l).is_err());
        assert!(l.output_root.join("a.opus").exists());
    }
}
