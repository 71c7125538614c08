//! Minimal FLAC container: the metadata block list plus opaque audio frames.
//!
//! ```text
//! "fLaC"
//! repeat { header: u8 (bit 7 = last block, bits 0..7 = type), length: u24 be, payload }
//! audio frames (kept verbatim)
//! ```
//!
//! The stream-info block is not interpreted. The last-block flag is
//! recomputed on every write, so callers may append or drop blocks freely.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::block::MetadataBlock;
use crate::error::{Result, TagError};

/// Stream marker at offset 0.
pub const FLAC_MARKER: &[u8; 4] = b"fLaC";

/// Largest payload a 24-bit block length can express.
pub const MAX_BLOCK_LEN: usize = 0x00FF_FFFF;

const LAST_BLOCK_FLAG: u8 = 0x80;
const KIND_MASK: u8 = 0x7F;

/// Parsed FLAC file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlacFile {
    /// Metadata blocks in stream order.
    pub blocks: Vec<MetadataBlock>,
    /// Everything after the last metadata block.
    pub audio: Vec<u8>,
}

impl FlacFile {
    /// Parse a complete FLAC stream.
    ///
    /// # Errors
    ///
    /// [`TagError::NotFlac`] without the `fLaC` marker,
    /// [`TagError::TruncatedInput`] if a block runs past the end.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut rest = bytes.strip_prefix(FLAC_MARKER).ok_or(TagError::NotFlac)?;
        let mut blocks = Vec::new();

        loop {
            let header: [u8; 4] = rest
                .get(..4)
                .and_then(|h| h.try_into().ok())
                .ok_or(TagError::TruncatedInput {
                    what: "block header",
                    needed: 4,
                    remaining: rest.len(),
                })?;
            let tail = rest.get(4..).unwrap_or_default();
            let [flags, l0, l1, l2] = header;
            let len = u32::from_be_bytes([0, l0, l1, l2]) as usize;
            if tail.len() < len {
                return Err(TagError::TruncatedInput {
                    what: "block payload",
                    needed: len,
                    remaining: tail.len(),
                });
            }
            let (payload, after) = tail.split_at(len);
            blocks.push(MetadataBlock::from_raw(flags & KIND_MASK, payload.to_vec()));
            rest = after;
            if flags & LAST_BLOCK_FLAG != 0 {
                break;
            }
        }

        Ok(Self {
            blocks,
            audio: rest.to_vec(),
        })
    }

    /// Read and parse a file.
    ///
    /// # Errors
    ///
    /// I/O failures and everything [`FlacFile::parse`] reports.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| TagError::io(path, e))?;
        Self::parse(&bytes)
    }

    /// Serialise the stream.
    ///
    /// # Errors
    ///
    /// [`TagError::BlockTooLarge`] if a payload exceeds [`MAX_BLOCK_LEN`].
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let meta_len = self.blocks.iter().fold(0usize, |acc, b| {
            acc.saturating_add(b.payload().len()).saturating_add(4)
        });
        let mut out =
            Vec::with_capacity(meta_len.saturating_add(self.audio.len()).saturating_add(4));
        out.extend_from_slice(FLAC_MARKER);

        let last = self.blocks.len().checked_sub(1);
        for (i, block) in self.blocks.iter().enumerate() {
            let payload = block.payload();
            if payload.len() > MAX_BLOCK_LEN {
                return Err(TagError::BlockTooLarge { len: payload.len() });
            }
            let mut flags = block.kind() & KIND_MASK;
            if Some(i) == last {
                flags |= LAST_BLOCK_FLAG;
            }
            let [_, l0, l1, l2] = u32::try_from(payload.len())
                .map_err(|_| TagError::BlockTooLarge { len: payload.len() })?
                .to_be_bytes();
            out.extend_from_slice(&[flags, l0, l1, l2]);
            out.extend_from_slice(payload);
        }
        out.extend_from_slice(&self.audio);
        Ok(out)
    }

    /// Write the stream to `path` via `<path>.tmp` and a rename, so the
    /// original file is never left half-written.
    ///
    /// A symlink is resolved first, so the link stays in place and its
    /// target is rewritten. The existing file's permissions carry over to
    /// the new one.
    ///
    /// # Errors
    ///
    /// Serialisation or I/O failure. On any failure the temp file is
    /// removed; the original is untouched either way.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        let target = match fs::canonicalize(path) {
            Ok(resolved) => resolved,
            Err(e) if e.kind() == io::ErrorKind::NotFound => path.to_path_buf(),
            Err(e) => return Err(TagError::io(path, e)),
        };
        let permissions = match fs::metadata(&target) {
            Ok(meta) => Some(meta.permissions()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(TagError::io(&target, e)),
        };

        let tmp = temp_path(&target);
        let written = fs::write(&tmp, &bytes)
            .and_then(|()| match permissions {
                Some(perms) => fs::set_permissions(&tmp, perms),
                None => Ok(()),
            })
            .map_err(|e| TagError::io(&tmp, e))
            .and_then(|()| fs::rename(&tmp, &target).map_err(|e| TagError::io(&target, e)));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        tracing::debug!(path = %target.display(), bytes = bytes.len(), "saved FLAC metadata");
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
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
    use crate::block::{KIND_COMMENT, KIND_PICTURE};
    use tempfile::TempDir;

    fn sample() -> FlacFile {
        FlacFile {
            blocks: vec![
                MetadataBlock::Other {
                    kind: 0,
                    data: vec![0xAA; 34],
                },
                MetadataBlock::Comment(vec![1, 2, 3]),
                MetadataBlock::Other {
                    kind: 1,
                    data: vec![0; 16],
                },
            ],
            audio: vec![0xFF, 0xF8, 0x12, 0x34],
        }
    }

    #[test]
    fn last_block_flag_set_only_on_final_block() {
        let bytes = sample().to_bytes().unwrap();
        assert_eq!(&bytes[0..4], FLAC_MARKER);
        assert_eq!(bytes[4], 0x00); // stream info, not last
        assert_eq!(&bytes[5..8], &[0, 0, 34]);
        let second = 4 + 4 + 34;
        assert_eq!(bytes[second], KIND_COMMENT);
        let third = second + 4 + 3;
        assert_eq!(bytes[third], 0x80 | 1);
    }

    #[test]
    fn parse_restores_blocks_and_audio() {
        let flac = sample();
        assert_eq!(FlacFile::parse(&flac.to_bytes().unwrap()).unwrap(), flac);
    }

    #[test]
    fn appended_block_moves_last_flag() {
        let mut flac = sample();
        flac.blocks.push(MetadataBlock::Picture(vec![7]));
        let bytes = flac.to_bytes().unwrap();
        let parsed = FlacFile::parse(&bytes).unwrap();
        assert_eq!(parsed.blocks.len(), 4);
        assert_eq!(parsed.blocks[3].kind(), KIND_PICTURE);
        assert_eq!(parsed.audio, flac.audio);
    }

    #[test]
    fn parse_rejects_missing_marker() {
        assert!(matches!(FlacFile::parse(b"ID3\x04"), Err(TagError::NotFlac)));
    }

    #[test]
    fn parse_rejects_truncated_payload() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes.truncate(20);
        assert!(matches!(
            FlacFile::parse(&bytes),
            Err(TagError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn oversized_block_is_rejected() {
        let flac = FlacFile {
            blocks: vec![MetadataBlock::Other {
                kind: 2,
                data: vec![0; MAX_BLOCK_LEN + 1],
            }],
            audio: vec![],
        };
        assert!(matches!(
            flac.to_bytes(),
            Err(TagError::BlockTooLarge { .. })
        ));
    }

    #[test]
    fn save_replaces_file_and_leaves_no_temp() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.flac");
        fs::write(&path, b"old").unwrap();
        sample().save(&path).unwrap();
        assert_eq!(FlacFile::read(&path).unwrap(), sample());
        assert!(!tmp.path().join("a.flac.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn save_through_symlink_rewrites_target() {
        let tmp = TempDir::new().unwrap();
        let real = tmp.path().join("real.flac");
        let link = tmp.path().join("link.flac");
        fs::write(&real, b"old").unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        sample().save(&link).unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(FlacFile::read(&real).unwrap(), sample());
        assert!(!tmp.path().join("real.flac.tmp").exists());
        assert!(!tmp.path().join("link.flac.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn save_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.flac");
        fs::write(&path, b"old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        sample().save(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn save_creates_missing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("new.flac");
        sample().save(&path).unwrap();
        assert_eq!(FlacFile::read(&path).unwrap(), sample());
    }
}
