//! External cover embedding.
//!
//! An existing embedded picture always wins; otherwise the cover file next
//! to the track is embedded as a front-cover JPEG. Width and height come
//! from the JPEG frame header, the payload is the file's raw bytes.

use std::fs;
use std::path::{Path, PathBuf};

use crate::block::MetadataBlock;
use crate::diagnostics::Diagnostic;
use crate::error::{Result, TagError};
use crate::picture::PictureBlock;

/// Default cover file name looked up next to each track.
pub const DEFAULT_COVER_NAME: &str = "cover.jpg";

/// What [`embed_cover`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverOutcome {
    /// The block list already has a picture; nothing changed.
    AlreadyPresent,
    /// No external cover exists; carries the warning to report.
    Missing(Diagnostic),
    /// A picture block was appended.
    Embedded {
        /// Pixel width from the JPEG header.
        width: u32,
        /// Pixel height from the JPEG header.
        height: u32,
        /// Size of the embedded image.
        bytes: usize,
    },
}

impl CoverOutcome {
    /// True if the block list was changed.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        matches!(self, Self::Embedded { .. })
    }
}

/// Embed `cover` into `blocks` unless a picture is already present.
///
/// # Errors
///
/// [`TagError::UnsupportedImage`] if the cover cannot be read or is not a
/// JPEG with a frame header. `blocks` is untouched on error.
pub fn embed_cover(
    file: &Path,
    blocks: &mut Vec<MetadataBlock>,
    cover: &Path,
) -> Result<CoverOutcome> {
    if blocks.iter().any(MetadataBlock::is_picture) {
        return Ok(CoverOutcome::AlreadyPresent);
    }
    if !cover.is_file() {
        return Ok(CoverOutcome::Missing(Diagnostic::MissingCover {
            file: file.to_path_buf(),
            cover: cover.to_path_buf(),
        }));
    }

    let data = fs::read(cover)
        .map_err(|e| TagError::UnsupportedImage(format!("{}: {e}", cover.display())))?;
    let (width, height) = jpeg_dimensions(&data)?;
    let bytes = data.len();
    blocks.push(MetadataBlock::picture(&PictureBlock::front_cover_jpeg(
        width, height, data,
    ))?);
    tracing::debug!(cover = %cover.display(), width, height, bytes, "embedded cover");

    Ok(CoverOutcome::Embedded {
        width,
        height,
        bytes,
    })
}

/// Path of the cover named `cover_name` in the directory of `track`.
#[must_use]
pub fn cover_path_for(track: &Path, cover_name: &str) -> PathBuf {
    track
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(cover_name)
}

/// Read pixel width and height from a JPEG header without decoding it.
///
/// Walks the marker segments after SOI until the first start-of-frame
/// marker (SOF0..SOF15, excluding DHT/JPG/DAC which share the range).
///
/// # Errors
///
/// [`TagError::UnsupportedImage`] for non-JPEG data or when no frame header
/// precedes the end of the header segments.
pub fn jpeg_dimensions(data: &[u8]) -> Result<(u32, u32)> {
    const SOI: u8 = 0xD8;
    const SOS: u8 = 0xDA;
    const EOI: u8 = 0xD9;

    let unsupported = |why: &str| TagError::UnsupportedImage(why.to_owned());

    if data.get(..2) != Some(&[0xFF, SOI][..]) {
        return Err(unsupported("not a JPEG (missing SOI marker)"));
    }

    let mut pos = 2usize;
    loop {
        // Markers may be preceded by any number of 0xFF fill bytes.
        if data.get(pos) != Some(&0xFF) {
            return Err(unsupported("corrupt JPEG marker stream"));
        }
        while data.get(pos) == Some(&0xFF) {
            pos = pos.saturating_add(1);
        }
        let marker = *data
            .get(pos)
            .ok_or_else(|| unsupported("JPEG ended before a frame header"))?;
        pos = pos.saturating_add(1);

        match marker {
            // Standalone markers carry no length.
            0x01 | 0xD0..=0xD7 => continue,
            SOS | EOI => return Err(unsupported("JPEG has no frame header before scan data")),
            _ => {}
        }

        let seg_len = be16(data, pos).ok_or_else(|| unsupported("truncated JPEG segment"))?;
        if seg_len < 2 {
            return Err(unsupported("invalid JPEG segment length"));
        }

        let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            // length(2) precision(1) height(2) width(2)
            let height = be16(data, pos.saturating_add(3));
            let width = be16(data, pos.saturating_add(5));
            return match (width, height) {
                (Some(w), Some(h)) if w > 0 && h > 0 => Ok((u32::from(w), u32::from(h))),
                (Some(_), Some(_)) => Err(unsupported("JPEG frame header has zero dimension")),
                _ => Err(unsupported("truncated JPEG frame header")),
            };
        }
        pos = pos.saturating_add(usize::from(seg_len));
    }
}

fn be16(data: &[u8], at: usize) -> Option<u16> {
    let hi = *data.get(at)?;
    let lo = *data.get(at.checked_add(1)?)?;
    Some(u16::from_be_bytes([hi, lo]))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
pub(crate) mod tests {
    use super::*;
    use crate::picture::FRONT_COVER;
    use tempfile::TempDir;

    /// Smallest header that carries dimensions: SOI, an APP0 segment, SOF0, EOI.
    pub(crate) fn tiny_jpeg(width: u16, height: u16) -> Vec<u8> {
        let mut j = vec![0xFF, 0xD8];
        j.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
        j.extend_from_slice(b"JFIF\0");
        j.extend_from_slice(&[1, 1, 0, 0, 1, 0, 1, 0, 0]);
        j.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08]);
        j.extend_from_slice(&height.to_be_bytes());
        j.extend_from_slice(&width.to_be_bytes());
        j.extend_from_slice(&[3, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1]);
        j.extend_from_slice(&[0xFF, 0xD9]);
        j
    }

    #[test]
    fn reads_dimensions_from_sof0() {
        assert_eq!(jpeg_dimensions(&tiny_jpeg(640, 480)).unwrap(), (640, 480));
    }

    #[test]
    fn skips_fill_bytes_and_reads_progressive_frames() {
        let mut j = tiny_jpeg(10, 20);
        // Insert a fill byte before SOF and switch it to SOF2 (progressive).
        let sof = j.windows(2).position(|w| w == [0xFF, 0xC0]).unwrap();
        j[sof + 1] = 0xC2;
        j.insert(sof, 0xFF);
        assert_eq!(jpeg_dimensions(&j).unwrap(), (10, 20));
    }

    #[test]
    fn rejects_png() {
        let png = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
        assert!(matches!(
            jpeg_dimensions(png),
            Err(TagError::UnsupportedImage(_))
        ));
    }

    #[test]
    fn rejects_truncated_header() {
        let j = tiny_jpeg(1, 1);
        assert!(jpeg_dimensions(&j[..j.len() - 16]).is_err());
    }

    #[test]
    fn rejects_scan_without_frame() {
        let j = [0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x02];
        assert!(jpeg_dimensions(&j).is_err());
    }

    #[test]
    fn existing_picture_is_never_replaced() {
        let tmp = TempDir::new().unwrap();
        let cover = tmp.path().join("cover.jpg");
        fs::write(&cover, tiny_jpeg(1, 1)).unwrap();
        let original = vec![MetadataBlock::Picture(vec![1, 2, 3])];
        let mut blocks = original.clone();
        let out = embed_cover(Path::new("a.flac"), &mut blocks, &cover).unwrap();
        assert_eq!(out, CoverOutcome::AlreadyPresent);
        assert_eq!(blocks, original);
    }

    #[test]
    fn missing_cover_warns_without_change() {
        let tmp = TempDir::new().unwrap();
        let cover = tmp.path().join("cover.jpg");
        let mut blocks = vec![MetadataBlock::Comment(vec![])];
        let out = embed_cover(Path::new("a.flac"), &mut blocks, &cover).unwrap();
        assert!(matches!(out, CoverOutcome::Missing(Diagnostic::MissingCover { .. })));
        assert!(!out.is_modified());
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn embeds_front_cover_with_raw_bytes() {
        let tmp = TempDir::new().unwrap();
        let cover = tmp.path().join("cover.jpg");
        let jpeg = tiny_jpeg(300, 200);
        fs::write(&cover, &jpeg).unwrap();
        let mut blocks = vec![MetadataBlock::Comment(vec![])];

        let out = embed_cover(Path::new("a.flac"), &mut blocks, &cover).unwrap();
        assert!(out.is_modified());
        assert_eq!(blocks.len(), 2);

        let pic = PictureBlock::decode(blocks[1].payload()).unwrap();
        assert_eq!(pic.picture_type, FRONT_COVER);
        assert_eq!(pic.mime_type, "image/jpeg");
        assert_eq!((pic.width, pic.height), (300, 200));
        assert_eq!((pic.depth, pic.colors), (24, 0));
        assert_eq!(pic.data, jpeg);
    }

    #[test]
    fn unreadable_image_is_unsupported_and_leaves_blocks() {
        let tmp = TempDir::new().unwrap();
        let cover = tmp.path().join("cover.jpg");
        fs::write(&cover, b"not an image").unwrap();
        let mut blocks = vec![];
        let err = embed_cover(Path::new("a.flac"), &mut blocks, &cover).unwrap_err();
        assert!(err.is_cover_only());
        assert!(blocks.is_empty());
    }

    #[test]
    fn cover_path_is_next_to_track() {
        assert_eq!(
            cover_path_for(Path::new("/m/a/b/01.flac"), "folder.jpg"),
            Path::new("/m/a/b/folder.jpg")
        );
    }
}
