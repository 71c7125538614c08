//! Multi-value tag merge.
//!
//! Some media servers only read the first value of a repeated Vorbis comment
//! key, so a track with two `MUSICBRAINZ_ARTISTID` entries loses the second
//! artist. Merging rewrites every repeated target key as a single entry with
//! its values joined by `+`, which those servers split back apart.
//!
//! A `+` already present inside a value is not escaped; the merged entry is
//! ambiguous for such input.

use std::collections::HashMap;
use std::path::Path;

use crate::comment::{split_entry, CommentBlock};
use crate::diagnostics::Diagnostic;

/// Separator placed between merged values.
pub const MERGE_SEPARATOR: char = '+';

/// Key prefix whose repeated non-target entries produce a warning.
pub const WARN_NAMESPACE: &str = "MUSICBRAINZ_";

/// Keys merged when no explicit list is configured.
pub const DEFAULT_MERGE_TARGETS: [&str; 3] = [
    "MUSICBRAINZ_ARTISTID",
    "MUSICBRAINZ_ALBUMARTISTID",
    "MUSICBRAINZ_RELEASE_ARTISTID",
];

/// Ordered list of keys to merge.
///
/// Order decides the position of merged entries in the output; the spelling
/// given here is the spelling written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeTargets(Vec<String>);

impl MergeTargets {
    /// Build from explicit keys. Duplicates (ignoring case) keep their first occurrence.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for key in keys {
            let key = key.into();
            if !out.iter().any(|k| k.eq_ignore_ascii_case(&key)) {
                out.push(key);
            }
        }
        Self(out)
    }

    /// Parse a comma-separated list such as `"A, B,C"`. Blank items are dropped.
    #[must_use]
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(',').map(str::trim).filter(|k| !k.is_empty()))
    }

    /// Keys in configured order.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.0
    }

    /// True if no key is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.0.iter().position(|k| k.eq_ignore_ascii_case(key))
    }
}

impl Default for MergeTargets {
    fn default() -> Self {
        Self::new(DEFAULT_MERGE_TARGETS)
    }
}

/// Result of [`merge_tags`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Revised block; identical to the input when `modified` is false.
    pub block: CommentBlock,
    /// Advisory warnings for repeated non-target keys in [`WARN_NAMESPACE`].
    pub warnings: Vec<Diagnostic>,
    /// `(target key, value count)` for every key that was merged.
    pub merged: Vec<(String, usize)>,
    /// True iff at least one target key had two or more values.
    pub modified: bool,
}

/// Merge repeated target keys of `block`.
///
/// Non-target entries (including entries without `=`) keep their relative
/// order and come first; then one entry per target key with at least one
/// value, in target order. A single value is written back unchanged, several
/// are joined with [`MERGE_SEPARATOR`] in encounter order.
#[must_use]
pub fn merge_tags(file: &Path, block: &CommentBlock, targets: &MergeTargets) -> MergeOutcome {
    let mut collected: Vec<Vec<&str>> = vec![Vec::new(); targets.keys().len()];
    let mut passthrough: Vec<String> = Vec::with_capacity(block.comments.len());

    // Repeated keys in the warning namespace, in first-encounter order.
    let mut watched: Vec<(String, usize)> = Vec::new();
    let mut watched_idx: HashMap<String, usize> = HashMap::new();

    for entry in &block.comments {
        let Some((key, value)) = split_entry(entry) else {
            passthrough.push(entry.clone());
            continue;
        };

        if let Some(slot) = targets.position(key).and_then(|i| collected.get_mut(i)) {
            slot.push(value);
            continue;
        }

        let upper = key.to_ascii_uppercase();
        if upper.starts_with(WARN_NAMESPACE) {
            match watched_idx.get(&upper).and_then(|&i| watched.get_mut(i)) {
                Some((_, count)) => *count = count.saturating_add(1),
                None => {
                    watched_idx.insert(upper.clone(), watched.len());
                    watched.push((upper, 1));
                }
            }
        }
        passthrough.push(entry.clone());
    }

    let warnings = watched
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(key, count)| Diagnostic::MultipleValues {
            file: file.to_path_buf(),
            key,
            count,
        })
        .collect();

    let mut merged = Vec::new();
    for (key, values) in targets.keys().iter().zip(&collected) {
        match values.as_slice() {
            [] => {}
            [single] => passthrough.push(format!("{key}={single}")),
            many => {
                let joined = many.join(MERGE_SEPARATOR.encode_utf8(&mut [0; 4]));
                passthrough.push(format!("{key}={joined}"));
                merged.push((key.clone(), many.len()));
            }
        }
    }

    let modified = !merged.is_empty();
    let block = if modified {
        CommentBlock {
            vendor: block.vendor.clone(),
            comments: passthrough,
        }
    } else {
        block.clone()
    };

    MergeOutcome {
        block,
        warnings,
        merged,
        modified,
    }
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

    fn block(comments: &[&str]) -> CommentBlock {
        CommentBlock::new("vendor", comments.iter().map(|c| (*c).to_owned()).collect())
    }

    fn merge(comments: &[&str], targets: &MergeTargets) -> MergeOutcome {
        merge_tags(Path::new("test.flac"), &block(comments), targets)
    }

    #[test]
    fn repeated_artist_ids_are_joined_after_other_tags() {
        let out = merge(
            &[
                "MUSICBRAINZ_ARTISTID=A",
                "MUSICBRAINZ_ARTISTID=B",
                "TITLE=X",
            ],
            &MergeTargets::default(),
        );
        assert!(out.modified);
        assert_eq!(out.block.comments, ["TITLE=X", "MUSICBRAINZ_ARTISTID=A+B"]);
        assert_eq!(out.block.vendor, "vendor");
        assert_eq!(out.merged, [("MUSICBRAINZ_ARTISTID".to_owned(), 2)]);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn merging_twice_is_a_no_op() {
        let first = merge(
            &["MUSICBRAINZ_ARTISTID=A", "MUSICBRAINZ_ARTISTID=B"],
            &MergeTargets::default(),
        );
        let second = merge_tags(
            Path::new("test.flac"),
            &first.block,
            &MergeTargets::default(),
        );
        assert!(!second.modified);
        assert_eq!(second.block, first.block);
    }

    #[test]
    fn non_target_musicbrainz_keys_only_warn() {
        let input = [
            "MUSICBRAINZ_RELEASEGROUPID=A",
            "MUSICBRAINZ_RELEASEGROUPID=B",
        ];
        let out = merge(&input, &MergeTargets::default());
        assert!(!out.modified);
        assert_eq!(out.block, block(&input));
        assert_eq!(
            out.warnings,
            [Diagnostic::MultipleValues {
                file: "test.flac".into(),
                key: "MUSICBRAINZ_RELEASEGROUPID".into(),
                count: 2,
            }]
        );
    }

    #[test]
    fn keys_outside_namespace_neither_merge_nor_warn() {
        let out = merge(&["GENRE=Rock", "GENRE=Pop"], &MergeTargets::default());
        assert!(!out.modified);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn target_matching_ignores_case_and_output_uses_configured_case() {
        let out = merge(
            &[
                "musicbrainz_albumartistid=1",
                "MusicBrainz_AlbumArtistId=2",
            ],
            &MergeTargets::default(),
        );
        assert!(out.modified);
        assert_eq!(out.block.comments, ["MUSICBRAINZ_ALBUMARTISTID=1+2"]);
    }

    #[test]
    fn merged_keys_follow_target_order() {
        let out = merge(
            &[
                "MUSICBRAINZ_RELEASE_ARTISTID=r",
                "MUSICBRAINZ_ALBUMARTISTID=b1",
                "MUSICBRAINZ_ARTISTID=a1",
                "MUSICBRAINZ_ALBUMARTISTID=b2",
                "ALBUM=Z",
            ],
            &MergeTargets::default(),
        );
        assert_eq!(
            out.block.comments,
            [
                "ALBUM=Z",
                "MUSICBRAINZ_ARTISTID=a1",
                "MUSICBRAINZ_ALBUMARTISTID=b1+b2",
                "MUSICBRAINZ_RELEASE_ARTISTID=r",
            ]
        );
    }

    #[test]
    fn custom_targets_replace_defaults() {
        let targets = MergeTargets::parse("CUSTOM_TAG");
        let out = merge(
            &[
                "CUSTOM_TAG=Value1",
                "CUSTOM_TAG=Value2",
                "OTHER_TAG=Value3",
                "OTHER_TAG=Value4",
            ],
            &targets,
        );
        assert!(out.modified);
        assert_eq!(
            out.block.comments,
            [
                "OTHER_TAG=Value3",
                "OTHER_TAG=Value4",
                "CUSTOM_TAG=Value1+Value2",
            ]
        );
    }

    #[test]
    fn entries_without_separator_pass_through_in_place() {
        let out = merge(
            &[
                "MUSICBRAINZ_ARTISTID=A",
                "garbage",
                "MUSICBRAINZ_ARTISTID=B",
                "TITLE=T",
            ],
            &MergeTargets::default(),
        );
        assert_eq!(
            out.block.comments,
            ["garbage", "TITLE=T", "MUSICBRAINZ_ARTISTID=A+B"]
        );
    }

    #[test]
    fn plus_inside_value_is_not_escaped() {
        let out = merge(
            &["MUSICBRAINZ_ARTISTID=A+B", "MUSICBRAINZ_ARTISTID=C"],
            &MergeTargets::default(),
        );
        assert_eq!(out.block.comments, ["MUSICBRAINZ_ARTISTID=A+B+C"]);
    }

    #[test]
    fn warnings_keep_first_encounter_order() {
        let out = merge(
            &[
                "MUSICBRAINZ_TRACKID=1",
                "MUSICBRAINZ_ALBUMID=1",
                "MUSICBRAINZ_ALBUMID=2",
                "MUSICBRAINZ_TRACKID=2",
                "MUSICBRAINZ_TRACKID=3",
            ],
            &MergeTargets::default(),
        );
        let keys: Vec<_> = out
            .warnings
            .iter()
            .map(|w| match w {
                Diagnostic::MultipleValues { key, count, .. } => (key.as_str(), *count),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(keys, [("MUSICBRAINZ_TRACKID", 3), ("MUSICBRAINZ_ALBUMID", 2)]);
    }

    #[test]
    fn parse_trims_and_drops_blanks() {
        let t = MergeTargets::parse(" A , b,, A ");
        assert_eq!(t.keys(), ["A", "b"]);
        assert!(MergeTargets::parse(" , ").is_empty());
    }
}
