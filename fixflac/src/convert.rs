//! `--convert-opus DIR`: mirror the library through the encoder.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use library::{CommandEncoder, FileOutcome, Mirror, MirrorLayout, SyncOptions, SyncReport};

use crate::report::LogObserver;

/// Convert one file, or sync a whole tree (pruning unless `prune` is off).
///
/// A single file is mirrored relative to its own directory and never
/// triggers a prune.
pub fn run(path: &Path, output: &Path, prune: bool, encoder: CommandEncoder) -> Result<SyncReport> {
    encoder
        .locate()
        .context("the encoder must be installed and on PATH")?;

    let source = absolute(path)?;
    let output = absolute(output)?;
    let mut observer = LogObserver;

    if !source.is_dir() {
        let mirror = Mirror::new(MirrorLayout::for_file(&source, output), encoder);
        let mut report = SyncReport::default();
        let rel = source.file_name().map(PathBuf::from).unwrap_or_default();
        match mirror.sync_file(&source, &mut observer) {
            Ok(FileOutcome::Converted) => report.converted.push(rel),
            Ok(FileOutcome::Skipped) => report.skipped.push(rel),
            Err(e) => report.failed.push((rel, e)),
        }
        return Ok(report);
    }

    let mirror = Mirror::new(MirrorLayout::flac_to_opus(source, output), encoder);
    Ok(mirror.sync_tree(&SyncOptions { prune }, &mut observer))
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("reading the current directory")?;
    Ok(cwd.join(path))
}
