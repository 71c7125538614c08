//! Tagged metadata block as exchanged with the container layer.
//!
//! Payloads stay opaque bytes; [`CommentBlock`] and [`PictureBlock`] decode
//! them on demand.

use crate::comment::CommentBlock;
use crate::error::Result;
use crate::picture::PictureBlock;

/// FLAC block type code of `VORBIS_COMMENT`.
pub const KIND_COMMENT: u8 = 4;
/// FLAC block type code of `PICTURE`.
pub const KIND_PICTURE: u8 = 6;

/// One metadata block of a FLAC stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataBlock {
    /// Vorbis comment payload.
    Comment(Vec<u8>),
    /// Picture payload.
    Picture(Vec<u8>),
    /// Any other block (stream info, padding, seek table, ...), untouched.
    Other {
        /// FLAC block type code.
        kind: u8,
        /// Raw payload.
        data: Vec<u8>,
    },
}

impl MetadataBlock {
    /// Wrap a raw payload according to its FLAC type code.
    #[must_use]
    pub fn from_raw(kind: u8, data: Vec<u8>) -> Self {
        match kind {
            KIND_COMMENT => Self::Comment(data),
            KIND_PICTURE => Self::Picture(data),
            _ => Self::Other { kind, data },
        }
    }

    /// FLAC block type code.
    #[must_use]
    pub fn kind(&self) -> u8 {
        match self {
            Self::Comment(_) => KIND_COMMENT,
            Self::Picture(_) => KIND_PICTURE,
            Self::Other { kind, .. } => *kind,
        }
    }

    /// Raw payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        match self {
            Self::Comment(data) | Self::Picture(data) | Self::Other { data, .. } => data,
        }
    }

    /// Encode a comment block into a new metadata block.
    ///
    /// # Errors
    ///
    /// Propagates [`CommentBlock::encode`] failures.
    pub fn comment(block: &CommentBlock) -> Result<Self> {
        Ok(Self::Comment(block.encode()?))
    }

    /// Encode a picture block into a new metadata block.
    ///
    /// # Errors
    ///
    /// Propagates [`PictureBlock::encode`] failures.
    pub fn picture(block: &PictureBlock) -> Result<Self> {
        Ok(Self::Picture(block.encode()?))
    }

    /// True for picture blocks.
    #[must_use]
    pub fn is_picture(&self) -> bool {
        matches!(self, Self::Picture(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_dispatches_on_kind() {
        assert!(matches!(MetadataBlock::from_raw(4, vec![]), MetadataBlock::Comment(_)));
        assert!(MetadataBlock::from_raw(6, vec![]).is_picture());
        assert_eq!(MetadataBlock::from_raw(1, vec![0; 3]).kind(), 1);
    }

    #[test]
    fn payload_is_shared_across_variants() {
        let other = MetadataBlock::Other {
            kind: 0,
            data: vec![9, 9],
        };
        assert_eq!(other.payload(), &[9, 9]);
        assert_eq!(MetadataBlock::Comment(vec![1]).payload(), &[1]);
    }
}
