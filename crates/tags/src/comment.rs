//! Vorbis comment payload — the body of a FLAC `VORBIS_COMMENT` block.
//!
//! Layout (all lengths little-endian `u32`):
//! ```text
//! vendor_length   u32
//! vendor          [u8; vendor_length]
//! comment_count   u32
//! comment_count × { entry_length u32, entry [u8; entry_length] }
//! ```
//!
//! Entries are usually `KEY=value` but nothing here requires the `=`;
//! entries without one are carried through as opaque strings.

use crate::bytes::{length_prefix, put_prefixed, put_u32, Cursor, Endian};
use crate::error::Result;

/// Decoded comment block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentBlock {
    /// Encoder vendor string.
    pub vendor: String,
    /// Raw entries in file order.
    pub comments: Vec<String>,
}

impl CommentBlock {
    /// Create a block from a vendor string and entries.
    pub fn new(vendor: impl Into<String>, comments: Vec<String>) -> Self {
        Self {
            vendor: vendor.into(),
            comments,
        }
    }

    /// Decode a comment payload.
    ///
    /// Bytes after the last declared entry are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::TruncatedInput`](crate::TagError::TruncatedInput) if a declared length
    /// runs past the end of `data`, and
    /// [`TagError::InvalidText`](crate::TagError::InvalidText) for non UTF-8 text.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(data, Endian::Little);
        let vendor = cur.text("vendor")?;
        let count = cur.u32("comment count")?;

        // Each entry needs at least its 4-byte length; cap the preallocation
        // so a hostile count cannot reserve gigabytes.
        let mut comments = Vec::with_capacity((count as usize).min(cur.remaining() / 4));
        for _ in 0..count {
            comments.push(cur.text("comment")?);
        }
        Ok(Self { vendor, comments })
    }

    /// Encode back into the exact on-disk layout.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::LengthOverflow`](crate::TagError::LengthOverflow) if the vendor, any entry
    /// or the entry count does not fit a `u32`.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let body: usize = self
            .comments
            .iter()
            .fold(self.vendor.len(), |acc, c| acc.saturating_add(c.len()));
        let mut out = Vec::with_capacity(
            body.saturating_add(self.comments.len().saturating_add(2).saturating_mul(4)),
        );

        put_prefixed(&mut out, self.vendor.as_bytes(), Endian::Little, "vendor")?;
        put_u32(
            &mut out,
            length_prefix(self.comments.len(), "comment count")?,
            Endian::Little,
        );
        for c in &self.comments {
            put_prefixed(&mut out, c.as_bytes(), Endian::Little, "comment")?;
        }
        Ok(out)
    }

    /// Iterate `(key, value)` pairs of entries that contain `=`.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.comments.iter().filter_map(|c| split_entry(c))
    }

    /// Values of `key`, compared case-insensitively, in file order.
    pub fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }
}

/// Split `KEY=value` at the first `=`. Returns `None` when there is no `=`.
#[must_use]
pub fn split_entry(entry: &str) -> Option<(&str, &str)> {
    entry.split_once('=')
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
    use crate::error::TagError;

    fn sample() -> CommentBlock {
        CommentBlock::new(
            "reference libFLAC 1.3.2 20170101",
            vec!["TITLE=Test Title".into(), "ARTIST=Test Artist".into()],
        )
    }

    #[test]
    fn decode_reads_vendor_and_comments() {
        let decoded = CommentBlock::decode(&sample().encode().unwrap()).unwrap();
        assert_eq!(decoded.vendor, "reference libFLAC 1.3.2 20170101");
        assert_eq!(decoded.comments, sample().comments);
    }

    #[test]
    fn encode_layout_is_little_endian() {
        let block = CommentBlock::new("ab", vec!["K=v".into()]);
        let bytes = block.encode().unwrap();
        assert_eq!(
            bytes,
            [
                2, 0, 0, 0, b'a', b'b', //
                1, 0, 0, 0, //
                3, 0, 0, 0, b'K', b'=', b'v',
            ]
        );
    }

    #[test]
    fn empty_block_is_eight_zero_bytes() {
        assert_eq!(CommentBlock::default().encode().unwrap(), [0u8; 8]);
    }

    #[test]
    fn entry_without_equals_is_preserved() {
        let block = CommentBlock::new("v", vec!["no separator here".into(), "A=1".into()]);
        let decoded = CommentBlock::decode(&block.encode().unwrap()).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(decoded.entries().count(), 1);
    }

    #[test]
    fn decode_rejects_truncated_entry() {
        let mut bytes = sample().encode().unwrap();
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(
            CommentBlock::decode(&bytes),
            Err(TagError::TruncatedInput { what: "comment", .. })
        ));
    }

    #[test]
    fn decode_rejects_missing_count() {
        let bytes = [1, 0, 0, 0, b'x'];
        assert!(matches!(
            CommentBlock::decode(&bytes),
            Err(TagError::TruncatedInput {
                what: "comment count",
                ..
            })
        ));
    }

    #[test]
    fn decode_rejects_count_larger_than_payload() {
        let mut bytes = CommentBlock::new("v", vec![]).encode().unwrap();
        bytes[5..9].copy_from_slice(&1000u32.to_le_bytes());
        assert!(CommentBlock::decode(&bytes).is_err());
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut bytes = sample().encode().unwrap();
        bytes.extend_from_slice(&[0, 0, 0]);
        assert_eq!(CommentBlock::decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn values_lookup_is_case_insensitive() {
        let block = CommentBlock::new(
            "v",
            vec![
                "musicbrainz_artistid=a".into(),
                "MUSICBRAINZ_ARTISTID=b".into(),
                "TITLE=x=y".into(),
            ],
        );
        let ids: Vec<_> = block.values("MusicBrainz_ArtistId").collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(block.values("title").collect::<Vec<_>>(), ["x=y"]);
    }
}
