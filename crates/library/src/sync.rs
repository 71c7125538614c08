//! Library sync engine.
//!
//! Per source file:
//!
//! ```text
//! Discovered ─┬─ output mtime >= source mtime ──────────────► Skipped
//!             └─ Converting ─┬─ encode ok, rename ok ───────► Converted
//!                            ├─ encode failed ──────────────► Err(Encoder), temp removed
//!                            └─ rename failed ──────────────► Err(Filesystem), temp kept
//! ```
//!
//! The final output path is only ever written by `rename`, so it never holds
//! partial encoder output.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;

use crate::encoder::Encoder;
use crate::error::{serialize_failures, FsOp, Result, SyncError};
use crate::events::{SyncEvent, SyncObserver};
use crate::layout::{temp_path, MirrorLayout};
use crate::prune::{apply_prune, plan_prune, PruneReport};
use crate::scanner::Scanner;

/// Terminal state of a successfully handled file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Output was already up to date; the encoder did not run.
    Skipped,
    /// Output was (re)written.
    Converted,
}

/// Options for [`Mirror::sync_tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Prune the output tree after converting.
    pub prune: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self { prune: true }
    }
}

/// Summary of a tree run. Paths are relative to the source root.
#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    /// Files written.
    pub converted: Vec<PathBuf>,
    /// Files already up to date.
    pub skipped: Vec<PathBuf>,
    /// Per-file failures, in scan order.
    #[serde(serialize_with = "serialize_failures")]
    pub failed: Vec<(PathBuf, SyncError)>,
    /// Prune result; `None` if pruning was disabled or skipped.
    pub prune: Option<PruneReport>,
}

impl SyncReport {
    /// True if no file failed, pruning included.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.prune.as_ref().map_or(true, |p| p.failed.is_empty())
    }
}

/// Mirrors a source tree into an output tree through an [`Encoder`].
#[derive(Debug, Clone)]
pub struct Mirror<E> {
    layout: MirrorLayout,
    encoder: E,
}

impl<E: Encoder> Mirror<E> {
    /// Create a mirror.
    pub fn new(layout: MirrorLayout, encoder: E) -> Self {
        Self { layout, encoder }
    }

    /// The path geometry in use.
    pub fn layout(&self) -> &MirrorLayout {
        &self.layout
    }

    /// Bring the output for one source file up to date.
    ///
    /// # Errors
    ///
    /// [`SyncError::Encoder`] (temp removed, output untouched),
    /// [`SyncError::Filesystem`] for directory creation, stat or rename
    /// failures (a failed rename keeps the temp file), and
    /// [`SyncError::OutsideRoot`].
    pub fn sync_file(
        &self,
        source: &Path,
        observer: &mut impl SyncObserver,
    ) -> Result<FileOutcome> {
        let rel = self.layout.relative(source)?.to_path_buf();
        let output = self.layout.output_path(source)?;

        if let Some(dir) = output.parent() {
            fs::create_dir_all(dir).map_err(|e| SyncError::fs(FsOp::CreateDir, dir, e))?;
        }

        let source_mtime = mtime(source)?;
        if let Some(output_mtime) = existing_mtime(&output)? {
            if output_mtime >= source_mtime {
                tracing::debug!(path = %rel.display(), "up to date");
                observer.on_event(SyncEvent::Skipped { path: rel });
                return Ok(FileOutcome::Skipped);
            }
        }

        observer.on_event(SyncEvent::Converting { path: rel.clone() });
        let tmp = temp_path(&output);
        if let Err(error) = self.encoder.encode(source, &tmp) {
            discard(&tmp);
            return Err(SyncError::Encoder {
                source_path: source.to_path_buf(),
                error,
            });
        }

        fs::rename(&tmp, &output).map_err(|e| SyncError::fs(FsOp::Rename, &tmp, e))?;
        tracing::debug!(output = %output.display(), "committed");
        observer.on_event(SyncEvent::Converted { path: rel });
        Ok(FileOutcome::Converted)
    }

    /// Convert every source file, then prune unless disabled.
    ///
    /// A failing file never stops its siblings. Pruning is skipped if the
    /// source scan itself failed.
    pub fn sync_tree(&self, options: &SyncOptions, observer: &mut impl SyncObserver) -> SyncReport {
        let mut report = SyncReport::default();
        let scanner = Scanner::new(&self.layout.source_ext);

        let sources = match scanner.scan(&self.layout.source_root) {
            Ok(sources) => sources,
            Err(e) => {
                report.failed.push((PathBuf::new(), e));
                return report;
            }
        };

        for source in &sources {
            let rel = self
                .layout
                .relative(source)
                .map_or_else(|_| source.clone(), Path::to_path_buf);
            match self.sync_file(source, observer) {
                Ok(FileOutcome::Converted) => report.converted.push(rel),
                Ok(FileOutcome::Skipped) => report.skipped.push(rel),
                Err(e) => {
                    tracing::debug!(path = %rel.display(), error = %e, "sync failed");
                    report.failed.push((rel, e));
                }
            }
        }

        if options.prune {
            match plan_prune(&self.layout) {
                Ok(plan) => report.prune = Some(apply_prune(&plan, observer)),
                Err(e) => report.failed.push((PathBuf::new(), e)),
            }
        }

        report
    }
}

fn mtime(path: &Path) -> Result<SystemTime> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| SyncError::fs(FsOp::Stat, path, e))
}

fn existing_mtime(path: &Path) -> Result<Option<SystemTime>> {
    match fs::metadata(path) {
        Ok(meta) => meta
            .modified()
            .map(Some)
            .map_err(|e| SyncError::fs(FsOp::Stat, path, e)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SyncError::fs(FsOp::Stat, path, e)),
    }
}

fn discard(tmp: &Path) {
    if let Err(e) = fs::remove_file(tmp) {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(path = %tmp.display(), error = %e, "could not remove temp file");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::error::EncodeError;
    use std::cell::Cell;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Copies the source and counts calls.
    #[derive(Default)]
    struct CopyEncoder {
        calls: Cell<usize>,
    }

    impl Encoder for CopyEncoder {
        fn encode(&self, source: &Path, dest: &Path) -> std::result::Result<(), EncodeError> {
            self.calls.set(self.calls.get().saturating_add(1));
            fs::copy(source, dest).map(drop).map_err(|source| EncodeError::Spawn {
                program: "copy".into(),
                source,
            })
        }
    }

    fn set_mtime(path: &Path, t: SystemTime) {
        fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(t)
            .unwrap();
    }

    fn setup() -> (TempDir, MirrorLayout, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let layout = MirrorLayout::flac_to_opus(tmp.path().join("src"), tmp.path().join("out"));
        let source = layout.source_root.join("Artist/Song.flac");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, b"pcm").unwrap();
        (tmp, layout, source)
    }

    #[test]
    fn missing_output_converts_and_creates_parents() {
        let (_tmp, layout, source) = setup();
        let mirror = Mirror::new(layout.clone(), CopyEncoder::default());
        let mut events: Vec<SyncEvent> = Vec::new();
        assert_eq!(mirror.sync_file(&source, &mut events).unwrap(), FileOutcome::Converted);

        let out = layout.output_root.join("Artist/Song.opus");
        assert_eq!(fs::read(&out).unwrap(), b"pcm");
        assert!(!temp_path(&out).exists());
        assert_eq!(
            events,
            vec![
                SyncEvent::Converting { path: "Artist/Song.flac".into() },
                SyncEvent::Converted { path: "Artist/Song.flac".into() },
            ]
        );
    }

    #[test]
    fn equal_mtime_is_up_to_date() {
        let (_tmp, layout, source) = setup();
        let out = layout.output_path(&source).unwrap();
        fs::create_dir_all(out.parent().unwrap()).unwrap();
        fs::write(&out, b"old").unwrap();
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        set_mtime(&source, t);
        set_mtime(&out, t);

        let enc = CopyEncoder::default();
        let mirror = Mirror::new(layout, &enc);
        assert_eq!(mirror.sync_file(&source, &mut ()).unwrap(), FileOutcome::Skipped);
        assert_eq!(enc.calls.get(), 0);
        assert_eq!(fs::read(&out).unwrap(), b"old");
    }

    #[test]
    fn source_outside_root_is_rejected() {
        let (tmp, layout, _source) = setup();
        let stray = tmp.path().join("stray.flac");
        fs::write(&stray, b"x").unwrap();
        let mirror = Mirror::new(layout, CopyEncoder::default());
        assert!(matches!(
            mirror.sync_file(&stray, &mut ()),
            Err(SyncError::OutsideRoot { .. })
        ));
    }

    #[test]
    fn tree_without_prune_leaves_orphans() {
        let (_tmp, layout, _source) = setup();
        let orphan = layout.output_root.join("Old/x.opus");
        fs::create_dir_all(orphan.parent().unwrap()).unwrap();
        fs::write(&orphan, b"x").unwrap();

        let mirror = Mirror::new(layout, CopyEncoder::default());
        let report = mirror.sync_tree(&SyncOptions { prune: false }, &mut ());
        assert_eq!(report.converted, vec![PathBuf::from("Artist/Song.flac")]);
        assert!(report.prune.is_none());
        assert!(orphan.exists());
    }

    #[test]
    fn missing_source_root_fails_without_pruning() {
        let (tmp, mut layout, _source) = setup();
        let kept = layout.output_root.join("a.opus");
        fs::create_dir_all(&layout.output_root).unwrap();
        fs::write(&kept, b"x").unwrap();
        layout.source_root = tmp.path().join("unmounted");

        let report = Mirror::new(layout, CopyEncoder::default()).sync_tree(&SyncOptions::default(), &mut ());
        assert_eq!(report.failed.len(), 1);
        assert!(report.prune.is_none());
        assert!(kept.exists());
    }
}
