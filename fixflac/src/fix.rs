//! `--mb-ids` / `--embed-cover`: fix tags in place.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use library::Scanner;
use tags::{fix_file, FixOptions};

use crate::report::{Failure, FixSummary, LogSink};

/// Fix one file, or every `.flac` under a directory.
///
/// Per-file failures are collected; only an unreadable tree aborts.
pub fn run(path: &Path, options: &FixOptions) -> Result<FixSummary> {
    let files: Vec<PathBuf> = if path.is_dir() {
        Scanner::new("flac")
            .scan(path)
            .with_context(|| format!("scanning {}", path.display()))?
    } else {
        vec![path.to_path_buf()]
    };

    let mut sink = LogSink::default();
    let mut summary = FixSummary {
        write: options.write,
        files: files.len(),
        ..FixSummary::default()
    };

    for file in &files {
        tracing::debug!("Processing: {}", file.display());
        match fix_file(file, options, &mut sink) {
            Ok(report) => {
                if report.modified() {
                    summary.modified = summary.modified.saturating_add(1);
                }
                if report.saved {
                    summary.saved = summary.saved.saturating_add(1);
                }
            }
            Err(e) => {
                tracing::error!("{}: {e}", file.display());
                summary.failed.push(Failure {
                    path: file.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    summary.warnings = sink.warnings();
    summary.diagnostics = sink.diagnostics;
    Ok(summary)
}
