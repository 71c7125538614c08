//! Structured diagnostics emitted by the per-file fixer.
//!
//! The library never logs on its own; callers pass a [`DiagnosticSink`] and
//! decide how to render or count what arrives.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Progress information.
    Info,
    /// Non-fatal anomaly worth a human look.
    Warn,
}

/// One event from the tag fixer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A non-target tag carries several values. Advisory only, never merged.
    MultipleValues {
        /// FLAC file.
        file: PathBuf,
        /// Tag key, upper-cased.
        key: String,
        /// Number of values.
        count: usize,
    },
    /// Several values of a merge target were joined into one entry.
    Merged {
        /// FLAC file.
        file: PathBuf,
        /// Merge target key.
        key: String,
        /// Number of values joined.
        count: usize,
    },
    /// No embedded picture and no external cover next to the file.
    MissingCover {
        /// FLAC file.
        file: PathBuf,
        /// Expected cover path.
        cover: PathBuf,
    },
    /// The external cover exists but could not be used.
    UnsupportedCover {
        /// FLAC file.
        file: PathBuf,
        /// Cover path.
        cover: PathBuf,
        /// Why the image was rejected.
        reason: String,
    },
    /// An external cover was embedded.
    CoverEmbedded {
        /// FLAC file.
        file: PathBuf,
        /// Cover path.
        cover: PathBuf,
    },
    /// Changes were found but writing is disabled.
    DryRun {
        /// FLAC file.
        file: PathBuf,
    },
    /// Changes are being written back.
    Saving {
        /// FLAC file.
        file: PathBuf,
    },
}

impl Diagnostic {
    /// Severity of this event.
    #[must_use]
    pub fn level(&self) -> Level {
        match self {
            Self::MultipleValues { .. } | Self::MissingCover { .. } | Self::UnsupportedCover { .. } => {
                Level::Warn
            }
            Self::Merged { .. } | Self::CoverEmbedded { .. } | Self::DryRun { .. } | Self::Saving { .. } => {
                Level::Info
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultipleValues { file, key, count } => write!(
                f,
                "{}: multiple values found for {key} (count: {count}); media servers may misread it",
                file.display()
            ),
            Self::Merged { file, key, count } => {
                write!(f, "{}: merging {count} {key}", file.display())
            }
            Self::MissingCover { file, cover } => write!(
                f,
                "{}: no embedded cover and no {} found",
                file.display(),
                cover.display()
            ),
            Self::UnsupportedCover {
                file,
                cover,
                reason,
            } => write!(
                f,
                "{}: cannot embed {}: {reason}",
                file.display(),
                cover.display()
            ),
            Self::CoverEmbedded { file, cover } => {
                write!(f, "{}: embedding {}", file.display(), cover.display())
            }
            Self::DryRun { file } => write!(
                f,
                "[DRY-RUN] changes detected for {}, not saving",
                file.display()
            ),
            Self::Saving { file } => write!(f, "saving changes to {}", file.display()),
        }
    }
}

/// Receiver of [`Diagnostic`] events.
pub trait DiagnosticSink {
    /// Handle one event.
    fn emit(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Adapter turning a closure into a [`DiagnosticSink`].
pub struct FnSink<F>(pub F);

impl<F: FnMut(Diagnostic)> DiagnosticSink for FnSink<F> {
    fn emit(&mut self, diagnostic: Diagnostic) {
        (self.0)(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_and_info_are_classified() {
        let warn = Diagnostic::MultipleValues {
            file: "a.flac".into(),
            key: "MUSICBRAINZ_RELEASEGROUPID".into(),
            count: 2,
        };
        let info = Diagnostic::Saving {
            file: "a.flac".into(),
        };
        assert_eq!(warn.level(), Level::Warn);
        assert_eq!(info.level(), Level::Info);
    }

    #[test]
    fn display_names_file_key_and_count() {
        let d = Diagnostic::MultipleValues {
            file: "x/a.flac".into(),
            key: "MUSICBRAINZ_TRACKID".into(),
            count: 3,
        };
        let text = d.to_string();
        assert!(text.contains("x/a.flac"));
        assert!(text.contains("MUSICBRAINZ_TRACKID"));
        assert!(text.contains("count: 3"));
    }

    #[test]
    fn closures_are_sinks() {
        let mut seen = 0;
        let mut sink = FnSink(|_: Diagnostic| seen += 1);
        sink.emit(Diagnostic::DryRun {
            file: "a.flac".into(),
        });
        drop(sink);
        assert_eq!(seen, 1);
    }
}
