//! Source → output path mapping.
//!
//! `<source_root>/<rel>/<name>.flac` maps to `<output_root>/<rel>/<name>.opus`;
//! the encoder writes `<output>.tmp` first. Extensions compare
//! ASCII-case-insensitively everywhere (discovery, output naming, pruning);
//! the rest of the path compares exactly.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};

/// Suffix appended to an output path while the encoder writes it.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Geometry of a mirrored library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorLayout {
    /// Root of the source tree.
    pub source_root: PathBuf,
    /// Root of the derived tree.
    pub output_root: PathBuf,
    /// Source extension without the dot, e.g. `flac`.
    pub source_ext: String,
    /// Output extension without the dot, e.g. `opus`.
    pub target_ext: String,
}

impl MirrorLayout {
    /// FLAC → Opus mirror.
    pub fn flac_to_opus(source_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            output_root: output_root.into(),
            source_ext: "flac".to_owned(),
            target_ext: "opus".to_owned(),
        }
    }

    /// Layout for a single file: its parent directory acts as the source root.
    #[must_use]
    pub fn for_file(source: &Path, output_root: impl Into<PathBuf>) -> Self {
        let parent = source.parent().unwrap_or_else(|| Path::new(""));
        Self::flac_to_opus(parent, output_root)
    }

    /// `source` relative to the source root.
    ///
    /// # Errors
    ///
    /// [`SyncError::OutsideRoot`] if `source` is not under the source root.
    pub fn relative<'a>(&self, source: &'a Path) -> Result<&'a Path> {
        source
            .strip_prefix(&self.source_root)
            .map_err(|_| SyncError::OutsideRoot {
                path: source.to_path_buf(),
                root: self.source_root.clone(),
            })
    }

    /// Final output path for `source`.
    ///
    /// # Errors
    ///
    /// [`SyncError::OutsideRoot`] if `source` is not under the source root.
    pub fn output_path(&self, source: &Path) -> Result<PathBuf> {
        let rel = self.relative(source)?;
        Ok(self.output_root.join(rel).with_extension(&self.target_ext))
    }

    /// True if `path` has the source extension.
    #[must_use]
    pub fn is_source(&self, path: &Path) -> bool {
        has_extension(path, &self.source_ext)
    }

    /// True if `path` has the output extension.
    #[must_use]
    pub fn is_output(&self, path: &Path) -> bool {
        has_extension(path, &self.target_ext)
    }

    /// True for a leftover temp file of this layout (`*.opus.tmp`).
    #[must_use]
    pub fn is_temp(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(OsStr::to_str) else {
            return false;
        };
        let Some(stem) = name.strip_suffix(TEMP_SUFFIX) else {
            return false;
        };
        has_extension(Path::new(stem), &self.target_ext)
    }
}

/// Temp path the encoder writes before the rename: `<output>.tmp`.
#[must_use]
pub fn temp_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// Relative path with its extension removed; the key that pairs a source
/// file with its output.
#[must_use]
pub fn source_key(rel: &Path) -> PathBuf {
    rel.with_extension("")
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn layout() -> MirrorLayout {
        MirrorLayout::flac_to_opus("/music/library", "/tmp/opus")
    }

    #[test]
    fn output_mirrors_relative_path_with_new_extension() {
        let out = layout()
            .output_path(Path::new("/music/library/Artist/Album/Song.flac"))
            .unwrap();
        assert_eq!(out, Path::new("/tmp/opus/Artist/Album/Song.opus"));
    }

    #[test]
    fn uppercase_source_extension_maps_to_target_extension() {
        let out = layout()
            .output_path(Path::new("/music/library/A/Song.FLAC"))
            .unwrap();
        assert_eq!(out, Path::new("/tmp/opus/A/Song.opus"));
    }

    #[test]
    fn dotted_stem_only_loses_final_extension() {
        let out = layout()
            .output_path(Path::new("/music/library/01. Intro.flac"))
            .unwrap();
        assert_eq!(out, Path::new("/tmp/opus/01. Intro.opus"));
    }

    #[test]
    fn source_outside_root_is_rejected() {
        assert!(matches!(
            layout().output_path(Path::new("/elsewhere/Song.flac")),
            Err(SyncError::OutsideRoot { .. })
        ));
    }

    #[test]
    fn temp_path_appends_suffix() {
        assert_eq!(
            temp_path(Path::new("/tmp/opus/A/Song.opus")),
            Path::new("/tmp/opus/A/Song.opus.tmp")
        );
    }

    #[test]
    fn extension_checks_ignore_case() {
        let l = layout();
        assert!(l.is_source(Path::new("a.Flac")));
        assert!(l.is_output(Path::new("a.OPUS")));
        assert!(!l.is_output(Path::new("a.opus.tmp")));
        assert!(l.is_temp(Path::new("a.opus.tmp")));
        assert!(!l.is_temp(Path::new("a.flac.tmp")));
        assert!(!l.is_source(Path::new("flac")));
    }

    #[test]
    fn single_file_layout_uses_parent_as_root() {
        let l = MirrorLayout::for_file(Path::new("/m/a/Song.flac"), "/out");
        assert_eq!(
            l.output_path(Path::new("/m/a/Song.flac")).unwrap(),
            Path::new("/out/Song.opus")
        );
    }

    #[test]
    fn source_key_strips_extension_only() {
        assert_eq!(
            source_key(Path::new("A/B/Song.flac")),
            Path::new("A/B/Song")
        );
        assert_eq!(source_key(Path::new("A/v1.2.opus")), Path::new("A/v1.2"));
    }
}
