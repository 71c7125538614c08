//! Sinks that forward library events to `tracing`, and the end-of-run
//! summary (coloured text or JSON).

use std::path::PathBuf;

use colored::Colorize;
use library::{SyncEvent, SyncObserver, SyncReport};
use serde::Serialize;
use tags::{Diagnostic, DiagnosticSink, Level};

/// Logs each diagnostic and keeps it for the JSON summary.
#[derive(Debug, Default)]
pub struct LogSink {
    pub diagnostics: Vec<Diagnostic>,
}

impl LogSink {
    pub fn warnings(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.level() == Level::Warn)
            .count()
    }
}

impl DiagnosticSink for LogSink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        match diagnostic.level() {
            Level::Info => tracing::info!("{diagnostic}"),
            Level::Warn => tracing::warn!("{diagnostic}"),
        }
        self.diagnostics.push(diagnostic);
    }
}

/// Logs sync progress; skips and removals only show with `-v`.
#[derive(Debug, Default)]
pub struct LogObserver;

impl SyncObserver for LogObserver {
    fn on_event(&mut self, event: SyncEvent) {
        if event.is_verbose() {
            tracing::debug!("{event}");
        } else {
            tracing::info!("{event}");
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Failure {
    pub path: PathBuf,
    pub error: String,
}

/// Result of a tag-fixing run.
#[derive(Debug, Default, Serialize)]
pub struct FixSummary {
    pub write: bool,
    pub files: usize,
    pub modified: usize,
    pub saved: usize,
    pub warnings: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub failed: Vec<Failure>,
}

impl FixSummary {
    pub fn print(&self) {
        println!();
        println!("{}", "Tag fix summary".cyan().bold());
        println!("  files scanned:  {}", self.files);
        println!("{}", format!("  files changed:  {}", self.modified).green());
        if self.write {
            println!("  files saved:    {}", self.saved);
        } else if self.modified > 0 {
            println!("{}", "  dry run: re-run with -w to write changes".yellow());
        }
        if self.warnings > 0 {
            println!("{}", format!("  warnings:       {}", self.warnings).yellow());
        }
        print_failures(&self.failed);
    }
}

pub fn print_sync(report: &SyncReport) {
    println!();
    println!("{}", "Opus mirror summary".cyan().bold());
    println!("{}", format!("  converted:      {}", report.converted.len()).green());
    println!("  up to date:     {}", report.skipped.len());
    if let Some(prune) = &report.prune {
        println!(
            "  pruned:         {} orphan(s), {} temp file(s), {} dir(s)",
            prune.removed_orphans.len(),
            prune.removed_temps.len(),
            prune.removed_dirs.len()
        );
    }
    let mut failed: Vec<Failure> = report
        .failed
        .iter()
        .map(|(path, e)| Failure {
            path: path.clone(),
            error: e.to_string(),
        })
        .collect();
    if let Some(prune) = &report.prune {
        failed.extend(prune.failed.iter().map(|(path, e)| Failure {
            path: path.clone(),
            error: e.to_string(),
        }));
    }
    print_failures(&failed);
}

fn print_failures(failed: &[Failure]) {
    if failed.is_empty() {
        return;
    }
    eprintln!("{}", format!("  ✗ {} failure(s)", failed.len()).red().bold());
    for f in failed {
        eprintln!("    {}: {}", f.path.display(), f.error);
    }
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
