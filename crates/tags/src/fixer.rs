//! Per-file fixer: tag merge and cover embedding over one FLAC file.
//!
//! Nothing is written unless a step changed the block list and
//! [`FixOptions::write`] is set; a dry run only reports.

use std::path::Path;

use serde::Serialize;

use crate::block::MetadataBlock;
use crate::comment::CommentBlock;
use crate::container::FlacFile;
use crate::cover::{cover_path_for, embed_cover, CoverOutcome, DEFAULT_COVER_NAME};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::{Result, TagError};
use crate::merge::{merge_tags, MergeTargets};

/// Which steps to run and whether to save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixOptions {
    /// Write changes back; `false` is a dry run.
    pub write: bool,
    /// Merge these keys. `None` skips the merge step.
    pub merge: Option<MergeTargets>,
    /// Embed the cover with this file name. `None` skips the cover step.
    pub cover: Option<String>,
}

impl Default for FixOptions {
    fn default() -> Self {
        Self {
            write: false,
            merge: Some(MergeTargets::default()),
            cover: Some(DEFAULT_COVER_NAME.to_owned()),
        }
    }
}

/// What happened to one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FixReport {
    /// At least one target key was merged.
    pub tags_merged: bool,
    /// A cover picture was embedded.
    pub cover_embedded: bool,
    /// The file was rewritten on disk.
    pub saved: bool,
}

impl FixReport {
    /// True if any step changed the metadata.
    #[must_use]
    pub fn modified(&self) -> bool {
        self.tags_merged || self.cover_embedded
    }
}

/// Run the configured steps over an in-memory block list.
///
/// Only the first comment block is considered for merging. An
/// [`TagError::UnsupportedImage`] from the cover step is reported as a
/// warning and does not undo the merge.
///
/// # Errors
///
/// Malformed comment payloads ([`TagError::TruncatedInput`],
/// [`TagError::InvalidText`]) and encoding failures abort the file.
pub fn fix_blocks(
    file: &Path,
    blocks: &mut Vec<MetadataBlock>,
    options: &FixOptions,
    sink: &mut impl DiagnosticSink,
) -> Result<FixReport> {
    let mut report = FixReport::default();

    if let Some(targets) = &options.merge {
        report.tags_merged = merge_step(file, blocks, targets, sink)?;
    }

    if let Some(name) = &options.cover {
        let cover = cover_path_for(file, name);
        match embed_cover(file, blocks, &cover) {
            Ok(CoverOutcome::Embedded { .. }) => {
                sink.emit(Diagnostic::CoverEmbedded {
                    file: file.to_path_buf(),
                    cover,
                });
                report.cover_embedded = true;
            }
            Ok(CoverOutcome::Missing(warning)) => sink.emit(warning),
            Ok(CoverOutcome::AlreadyPresent) => {}
            Err(TagError::UnsupportedImage(reason)) => sink.emit(Diagnostic::UnsupportedCover {
                file: file.to_path_buf(),
                cover,
                reason,
            }),
            Err(e) => return Err(e),
        }
    }

    Ok(report)
}

fn merge_step(
    file: &Path,
    blocks: &mut [MetadataBlock],
    targets: &MergeTargets,
    sink: &mut impl DiagnosticSink,
) -> Result<bool> {
    let Some(slot) = blocks
        .iter_mut()
        .find(|b| matches!(b, MetadataBlock::Comment(_)))
    else {
        return Ok(false);
    };

    let comments = CommentBlock::decode(slot.payload())?;
    let outcome = merge_tags(file, &comments, targets);
    for warning in outcome.warnings {
        sink.emit(warning);
    }
    for (key, count) in outcome.merged {
        sink.emit(Diagnostic::Merged {
            file: file.to_path_buf(),
            key,
            count,
        });
    }
    if outcome.modified {
        *slot = MetadataBlock::comment(&outcome.block)?;
    }
    Ok(outcome.modified)
}

/// Parse `path`, run the configured steps and save if anything changed.
///
/// # Errors
///
/// Read/parse failures and everything [`fix_blocks`] reports. The file is
/// left untouched whenever an error is returned.
pub fn fix_file(
    path: &Path,
    options: &FixOptions,
    sink: &mut impl DiagnosticSink,
) -> Result<FixReport> {
    let _span = tracing::debug_span!("fix_file", path = %path.display()).entered();

    let mut flac = FlacFile::read(path)?;
    let mut report = fix_blocks(path, &mut flac.blocks, options, sink)?;

    if !report.modified() {
        return Ok(report);
    }
    if !options.write {
        sink.emit(Diagnostic::DryRun {
            file: path.to_path_buf(),
        });
        return Ok(report);
    }

    sink.emit(Diagnostic::Saving {
        file: path.to_path_buf(),
    });
    flac.save(path)?;
    report.saved = true;
    Ok(report)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::cover::tests::tiny_jpeg;
    use std::fs;
    use tempfile::TempDir;

    fn comment_block(comments: &[&str]) -> MetadataBlock {
        let c = CommentBlock::new("v", comments.iter().map(|c| (*c).to_owned()).collect());
        MetadataBlock::comment(&c).unwrap()
    }

    fn fix_quietly(blocks: &mut Vec<MetadataBlock>, options: &FixOptions) -> Result<FixReport> {
        let mut diags: Vec<Diagnostic> = Vec::new();
        fix_blocks(Path::new("t.flac"), blocks, options, &mut diags)
    }

    fn merge_only() -> FixOptions {
        FixOptions {
            write: true,
            merge: Some(MergeTargets::default()),
            cover: None,
        }
    }

    #[test]
    fn merge_rewrites_first_comment_block() {
        let mut blocks = vec![
            MetadataBlock::Other {
                kind: 0,
                data: vec![0; 34],
            },
            comment_block(&["MUSICBRAINZ_ARTISTID=A", "MUSICBRAINZ_ARTISTID=B"]),
        ];
        let mut diags: Vec<Diagnostic> = Vec::new();
        let report = fix_blocks(Path::new("t.flac"), &mut blocks, &merge_only(), &mut diags)
            .unwrap();

        assert!(report.tags_merged);
        let c = CommentBlock::decode(blocks[1].payload()).unwrap();
        assert_eq!(c.comments, ["MUSICBRAINZ_ARTISTID=A+B"]);
        assert!(matches!(diags[0], Diagnostic::Merged { count: 2, .. }));
    }

    #[test]
    fn unmodified_block_keeps_original_bytes() {
        let original = comment_block(&["MUSICBRAINZ_ARTISTID=A", "TITLE=T"]);
        let mut blocks = vec![original.clone()];
        let report = fix_quietly(&mut blocks, &merge_only()).unwrap();
        assert!(!report.modified());
        assert_eq!(blocks, [original]);
    }

    #[test]
    fn no_comment_block_is_a_no_op() {
        let mut blocks = vec![MetadataBlock::Other {
            kind: 0,
            data: vec![],
        }];
        let report = fix_quietly(&mut blocks, &merge_only()).unwrap();
        assert!(!report.tags_merged);
    }

    #[test]
    fn truncated_comment_aborts() {
        let mut blocks = vec![MetadataBlock::Comment(vec![9, 0, 0, 0, b'x'])];
        let err = fix_quietly(&mut blocks, &merge_only()).unwrap_err();
        assert!(matches!(err, TagError::TruncatedInput { .. }));
    }

    #[test]
    fn unsupported_cover_warns_and_keeps_merge() {
        let tmp = TempDir::new().unwrap();
        let track = tmp.path().join("01.flac");
        fs::write(tmp.path().join("cover.jpg"), b"GIF89a").unwrap();
        let mut blocks = vec![comment_block(&[
            "MUSICBRAINZ_ARTISTID=A",
            "MUSICBRAINZ_ARTISTID=B",
        ])];
        let options = FixOptions {
            write: true,
            ..FixOptions::default()
        };
        let mut diags: Vec<Diagnostic> = Vec::new();
        let report = fix_blocks(&track, &mut blocks, &options, &mut diags).unwrap();

        assert!(report.tags_merged);
        assert!(!report.cover_embedded);
        assert!(diags
            .iter()
            .any(|d| matches!(d, Diagnostic::UnsupportedCover { .. })));
    }

    #[test]
    fn cover_step_embeds_next_to_track() {
        let tmp = TempDir::new().unwrap();
        let track = tmp.path().join("01.flac");
        fs::write(tmp.path().join("front.jpg"), tiny_jpeg(8, 8)).unwrap();
        let options = FixOptions {
            write: true,
            merge: None,
            cover: Some("front.jpg".into()),
        };
        let mut blocks = vec![comment_block(&[])];
        let mut diags: Vec<Diagnostic> = Vec::new();
        let report = fix_blocks(&track, &mut blocks, &options, &mut diags).unwrap();
        assert!(report.cover_embedded);
        assert!(blocks[1].is_picture());
    }
}
